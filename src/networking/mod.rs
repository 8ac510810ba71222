pub mod connection;
pub mod deadline;
pub mod timeout_conn;

/// Connected loopback sockets: `(client, server)`.
#[cfg(test)]
pub(crate) async fn socket_pair() -> anyhow::Result<(tokio::net::TcpStream, tokio::net::TcpStream)>
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (client, (server, _)) =
        tokio::try_join!(tokio::net::TcpStream::connect(addr), listener.accept())?;
    Ok((client, server))
}
