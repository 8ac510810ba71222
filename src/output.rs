use std::io::{self, Write};

/// Writes the error and its causes, one per line. Silent unless verbose.
pub fn report_error<W: Write>(out: &mut W, err: &anyhow::Error, verbose: bool) -> io::Result<()> {
    if !verbose {
        return Ok(());
    }
    writeln!(out, "{}", err)?;
    for cause in err.chain().skip(1) {
        writeln!(out, "  caused by: {}", cause)?;
    }
    Ok(())
}

/// Announces the connection. Goes to stderr so it never mixes with relayed data.
pub fn connected<W: Write>(out: &mut W, host: &str, port: u16, verbose: bool) -> io::Result<()> {
    if verbose {
        writeln!(out, "Succeeded to connect to {} {} port!", host, port)?;
    }
    Ok(())
}
