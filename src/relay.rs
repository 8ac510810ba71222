use log::{debug, info};
use std::io;
use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt};

/// Bytes moved during one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Bytes copied from the input to the connection, `None` if the input was
    /// still open when the session ended.
    pub sent: Option<u64>,
    /// Bytes copied from the connection to the output.
    pub received: u64,
}

/// Pumps a local input into a connection and the connection into a local output.
pub struct Relay {
    /// Shut down the write side of the connection once the input is exhausted.
    pub shutdown_on_eof: bool,
}

impl Relay {
    pub fn new(shutdown_on_eof: bool) -> Self {
        Self { shutdown_on_eof }
    }

    /// Runs both directions until the connection reaches end of stream.
    ///
    /// End of the input alone does not end the session. The first error from
    /// either direction does: both pumps are dropped together with the
    /// connection, which unblocks the other one.
    pub async fn run<C, I, O>(&self, conn: C, mut input: I, mut output: O) -> io::Result<Transfer>
    where
        C: AsyncRead + AsyncWrite,
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (mut reader, mut writer) = split(conn);

        let outbound = async {
            let sent = tokio::io::copy(&mut input, &mut writer).await?;
            debug!("Input closed after {} bytes.", sent);
            if self.shutdown_on_eof {
                writer.shutdown().await?;
            }
            Ok::<_, io::Error>(sent)
        };

        let inbound = async {
            let received = tokio::io::copy(&mut reader, &mut output).await?;
            output.flush().await?;
            Ok::<_, io::Error>(received)
        };

        tokio::pin!(outbound, inbound);

        let transfer = tokio::select! {
            received = &mut inbound => Transfer {
                sent: None,
                received: received?,
            },
            sent = &mut outbound => {
                let sent = sent?;
                Transfer {
                    sent: Some(sent),
                    received: inbound.await?,
                }
            }
        };

        info!("Connection closed by the remote end.");
        Ok(transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::{deadline::DeadlineStream, socket_pair, timeout_conn::TimeoutConnection};
    use anyhow::Result;
    use std::time::Duration;
    use tokio::{
        io::{duplex, empty, AsyncReadExt},
        time::sleep,
    };

    #[tokio::test]
    async fn moves_bytes_both_ways() -> Result<()> {
        let (client, mut server) = socket_pair().await?;
        let conn = TimeoutConnection::new(
            DeadlineStream::new(client),
            Duration::from_secs(2),
            Duration::from_secs(2),
        );

        let (mut stdin, input) = duplex(64);
        let (output, mut stdout) = duplex(64);

        let server_task = tokio::spawn(async move {
            let mut request = [0u8; 5];
            server.read_exact(&mut request).await?;
            server.write_all(b"pong").await?;
            Ok::<_, io::Error>(request)
        });

        let session = tokio::spawn(async move { Relay::new(false).run(conn, input, output).await });

        stdin.write_all(b"ping!").await?;
        drop(stdin);

        let request = server_task.await??;
        assert_eq!(&request, b"ping!");

        let transfer = session.await??;
        assert_eq!(
            transfer,
            Transfer {
                sent: Some(5),
                received: 4
            }
        );

        let mut received = Vec::new();
        stdout.read_to_end(&mut received).await?;
        assert_eq!(received, b"pong");
        Ok(())
    }

    #[tokio::test]
    async fn input_eof_keeps_reading_until_peer_closes() -> Result<()> {
        let (client, mut server) = socket_pair().await?;
        let conn = TimeoutConnection::new(DeadlineStream::new(client), Duration::ZERO, Duration::ZERO);

        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            let _ = server.write_all(b"late reply").await;
        });

        let (output, mut stdout) = duplex(64);
        let transfer = Relay::new(false).run(conn, empty(), output).await?;
        assert_eq!(transfer.sent, Some(0));
        assert_eq!(transfer.received, 10);

        let mut received = Vec::new();
        stdout.read_to_end(&mut received).await?;
        assert_eq!(received, b"late reply");
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_on_eof_half_closes_the_connection() -> Result<()> {
        let (client, mut server) = socket_pair().await?;
        let conn = TimeoutConnection::new(DeadlineStream::new(client), Duration::ZERO, Duration::ZERO);

        let server_task = tokio::spawn(async move {
            let mut request = Vec::new();
            server.read_to_end(&mut request).await?;
            server.write_all(&request).await?;
            Ok::<_, io::Error>(())
        });

        let (output, _stdout) = duplex(64);
        let transfer = Relay::new(true).run(conn, &b"echo"[..], output).await?;
        server_task.await??;

        assert_eq!(transfer.sent, Some(4));
        assert_eq!(transfer.received, 4);
        Ok(())
    }

    #[tokio::test]
    async fn idle_connection_aborts_the_session() -> Result<()> {
        let (client, _server) = socket_pair().await?;
        let conn = TimeoutConnection::new(
            DeadlineStream::new(client),
            Duration::from_millis(150),
            Duration::from_millis(150),
        );

        // Neither side ever sends anything.
        let (_stdin, input) = duplex(64);
        let (output, _stdout) = duplex(64);

        let err = Relay::new(false).run(conn, input, output).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        Ok(())
    }
}
