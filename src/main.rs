use anyhow::{Context, Result};
use env_logger::{Builder, WriteStyle};
use idlenc::{
    engine::Engine, input::Settings, output, relay::Relay, Connection, DeadlineStream,
    TimeoutConnection,
};
use log::{debug, LevelFilter};
use std::{io, process};

async fn run(settings: &Settings) -> Result<()> {
    let engine = Engine::new(settings.connect_timeout);
    let stream = engine
        .connect(&settings.host, settings.port)
        .await
        .with_context(|| format!("Cannot connect to {} port {}", settings.host, settings.port))?;
    output::connected(&mut io::stderr(), &settings.host, settings.port, settings.verbose)?;

    let conn = TimeoutConnection::new(
        DeadlineStream::new(stream),
        settings.read_timeout,
        settings.write_timeout,
    );
    debug!(
        "Relaying {} <-> {} (read timeout {:?}, write timeout {:?}).",
        conn.local_addr()?,
        conn.peer_addr()?,
        conn.read_timeout(),
        conn.write_timeout()
    );

    let transfer = Relay::new(settings.shutdown_on_eof)
        .run(conn, tokio::io::stdin(), tokio::io::stdout())
        .await?;
    debug!("{:?}", transfer);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Usage errors exit through clap before logging is set up.
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            let _ = output::report_error(&mut io::stderr(), &err, true);
            process::exit(1);
        }
    };

    Builder::new()
        .write_style(WriteStyle::Always)
        .filter_level(if settings.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Off
        })
        .parse_default_env()
        .init();

    // Exit without waiting on the blocking stdin reader.
    let code = match run(&settings).await {
        Ok(()) => 0,
        Err(err) => {
            let _ = output::report_error(&mut io::stderr(), &err, settings.verbose);
            1
        }
    };
    process::exit(code);
}
