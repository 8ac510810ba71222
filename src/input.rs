use crate::errors::ConfigError;
use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Connect to a TCP port and relay stdin/stdout, closing idle connections.
#[derive(Parser, Debug)]
#[command(name = "idlenc", version, about)]
pub struct Args {
    /// Remote host name or IP address.
    pub host: String,

    /// Remote port.
    pub port: u16,

    /// If a connection and stdin are idle for more than timeout seconds then the connection is silently closed.
    #[arg(short = 'w', long = "idle-timeout", value_name = "SECONDS")]
    pub idle_timeout: Option<u64>,

    /// TCP connection timeout in seconds.
    #[arg(short = 'G', long = "connect-timeout", value_name = "SECONDS")]
    pub connect_timeout: Option<u64>,

    /// Produce more verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Shut down the network socket after EOF on stdin.
    #[arg(short = 'N', long = "shutdown")]
    pub shutdown_on_eof: bool,

    /// TOML file with default settings.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Defaults read from a TOML file. Every field is optional, timeouts are in seconds.
#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Input {
    pub idle_timeout: Option<u64>,
    pub read_timeout: Option<u64>,
    pub write_timeout: Option<u64>,
    pub connect_timeout: Option<u64>,
    pub verbose: Option<bool>,
    pub shutdown_on_eof: Option<bool>,
}

pub fn load_config(path: &Path) -> Result<Input> {
    let data = fs::read(path)?;
    let text = String::from_utf8(data)?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<Input> {
    let input: Input = toml::from_str(text)?;
    Ok(input)
}

/// Everything the connection needs, after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub connect_timeout: Duration,
    pub verbose: bool,
    pub shutdown_on_eof: bool,
}

impl Settings {
    /// Command line flags win over the file. In the file, `read_timeout` and
    /// `write_timeout` win over `idle_timeout` for their direction.
    pub fn resolve(args: Args, file: Input) -> Result<Self> {
        let (read_secs, write_secs) = match args.idle_timeout {
            Some(idle) => (idle, idle),
            None => (
                file.read_timeout.or(file.idle_timeout).unwrap_or(0),
                file.write_timeout.or(file.idle_timeout).unwrap_or(0),
            ),
        };
        let connect_secs = args.connect_timeout.or(file.connect_timeout).unwrap_or(0);

        Ok(Self {
            host: args.host,
            port: args.port,
            read_timeout: seconds(read_secs, "read_timeout")?,
            write_timeout: seconds(write_secs, "write_timeout")?,
            connect_timeout: seconds(connect_secs, "connect_timeout")?,
            verbose: args.verbose || file.verbose.unwrap_or(false),
            shutdown_on_eof: args.shutdown_on_eof || file.shutdown_on_eof.unwrap_or(false),
        })
    }

    /// Parses the command line and loads the config file it points to, if any.
    pub fn from_env() -> Result<Self> {
        let args = Args::parse();
        let file = match &args.config {
            Some(path) => load_config(path)?,
            None => Input::default(),
        };
        Self::resolve(args, file)
    }
}

/// `Instant + Duration` panics on overflow, so absurd values are rejected here.
fn seconds(secs: u64, field: &'static str) -> Result<Duration> {
    const MAX_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;
    if secs > MAX_SECONDS {
        return Err(ConfigError::InvalidTimeout(field).into());
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["idlenc"];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["example.com", "80"]);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_disable_every_timeout() -> Result<()> {
        let settings = Settings::resolve(args(&[]), Input::default())?;
        assert_eq!(settings.host, "example.com");
        assert_eq!(settings.port, 80);
        assert_eq!(settings.read_timeout, Duration::ZERO);
        assert_eq!(settings.write_timeout, Duration::ZERO);
        assert_eq!(settings.connect_timeout, Duration::ZERO);
        assert!(!settings.verbose);
        assert!(!settings.shutdown_on_eof);
        Ok(())
    }

    #[test]
    fn idle_flag_sets_both_directions() -> Result<()> {
        let settings = Settings::resolve(args(&["-w", "3", "-G", "7", "-v", "-N"]), Input::default())?;
        assert_eq!(settings.read_timeout, Duration::from_secs(3));
        assert_eq!(settings.write_timeout, Duration::from_secs(3));
        assert_eq!(settings.connect_timeout, Duration::from_secs(7));
        assert!(settings.verbose);
        assert!(settings.shutdown_on_eof);
        Ok(())
    }

    #[test]
    fn file_directions_override_file_idle_timeout() -> Result<()> {
        let file = parse_config(
            r#"
            idle_timeout = 10
            write_timeout = 2
            connect_timeout = 4
            verbose = true
            "#,
        )?;
        let settings = Settings::resolve(args(&[]), file)?;
        assert_eq!(settings.read_timeout, Duration::from_secs(10));
        assert_eq!(settings.write_timeout, Duration::from_secs(2));
        assert_eq!(settings.connect_timeout, Duration::from_secs(4));
        assert!(settings.verbose);
        Ok(())
    }

    #[test]
    fn flags_override_the_file() -> Result<()> {
        let file = parse_config("read_timeout = 10\nconnect_timeout = 4")?;
        let settings = Settings::resolve(args(&["-w", "1", "-G", "0"]), file)?;
        assert_eq!(settings.read_timeout, Duration::from_secs(1));
        assert_eq!(settings.write_timeout, Duration::from_secs(1));
        assert_eq!(settings.connect_timeout, Duration::ZERO);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("timeout = 3").is_err());
    }

    #[test]
    fn huge_timeouts_are_rejected() {
        let err = Settings::resolve(args(&["-w", "18446744073709551615"]), Input::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Timeout for `read_timeout` is out of range.");
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(Args::try_parse_from(["idlenc", "example.com", "70000"]).is_err());
    }
}
