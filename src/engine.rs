use crate::errors::DialError;
use anyhow::Result;
use log::debug;
use std::{io, net::SocketAddr, time::Duration};
use tokio::{
    net::{lookup_host, TcpStream},
    time::timeout,
};

#[derive(Debug)]
pub struct Engine {
    /// Upper bound for resolving and dialing. Zero leaves it to the platform.
    pub timeout: Duration,
}

impl Engine {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Resolves `host` and connects to the first address that accepts.
    ///
    /// If the future does not complete before the timeout duration, an error is returned.
    pub async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        if self.timeout.is_zero() {
            return Self::dial(host, port).await;
        }
        match timeout(self.timeout, Self::dial(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(DialError::Timeout {
                host: host.to_string(),
                port,
            }
            .into()),
        }
    }

    async fn dial(host: &str, port: u16) -> Result<TcpStream> {
        let addrs = lookup_host((host, port)).await?;
        Self::connect_any(host, addrs).await
    }

    /// Tries each address in order. The last connect error wins if none accepts.
    async fn connect_any<I>(host: &str, addrs: I) -> Result<TcpStream>
    where
        I: IntoIterator<Item = SocketAddr>,
    {
        let mut last_error: Option<io::Error> = None;
        for addr in addrs {
            debug!("Trying {}.", addr);
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    debug!("Connecting to {} failed: {}", addr, err);
                    last_error = Some(err);
                }
            }
        }
        match last_error {
            Some(err) => Err(err.into()),
            None => Err(DialError::NoAddresses(host.to_string()).into()),
        }
    }
}
