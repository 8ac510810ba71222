use std::io;
use thiserror::Error;

/// Failures raised by the deadline layer itself.
///
/// They travel inside an `io::Error` so the connection types keep plain
/// `io::Result` signatures.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("i/o deadline exceeded")]
    DeadlineExceeded,
    #[error("write side of the connection is closed")]
    WriteClosed,
}

impl From<ConnectionError> for io::Error {
    fn from(err: ConnectionError) -> Self {
        let kind = match err {
            ConnectionError::DeadlineExceeded => io::ErrorKind::TimedOut,
            ConnectionError::WriteClosed => io::ErrorKind::NotConnected,
        };
        io::Error::new(kind, err)
    }
}

#[derive(Error, Debug)]
pub enum DialError {
    #[error("Cannot resolve any address for {0}.")]
    NoAddresses(String),
    #[error("Connection to {host} port {port} timed out.")]
    Timeout { host: String, port: u16 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Timeout for `{0}` is out of range.")]
    InvalidTimeout(&'static str),
}
