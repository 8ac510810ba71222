use std::{io, net::SocketAddr};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    time::Instant,
};

/// A bidirectional byte stream whose reads and writes can be bounded by deadlines.
///
/// A deadline is an absolute instant. `None` clears it, after which operations
/// in that direction may block indefinitely. A deadline that already passed
/// makes the next operation fail immediately with `ErrorKind::TimedOut`.
pub trait Connection: AsyncRead + AsyncWrite + Unpin {
    /// Sets the deadline for future and pending reads.
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;

    /// Sets the deadline for future and pending writes.
    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;

    /// Sets both deadlines, read first.
    ///
    /// The write deadline is not touched when the read deadline fails.
    fn set_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

/// Streams that know both ends of the socket they run over.
pub trait Endpoint {
    fn local_addr(&self) -> io::Result<SocketAddr>;
    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

impl Endpoint for TcpStream {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }
}
