use super::connection::Connection;
use futures::ready;
use std::{
    future::poll_fn,
    io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    time::Instant,
};

/// A connection that bounds every read and every write by an idle timeout.
///
/// Before a read starts, the read deadline of the wrapped connection is moved
/// to `now + read_timeout`; writes do the same with `write_timeout`. A zero
/// timeout disables this for its direction.
///
/// A deadline set explicitly through [`Connection::set_read_deadline`],
/// [`Connection::set_write_deadline`] or [`Connection::set_deadline`] wins over
/// the idle timeout: it is left alone until it is cleared again with `None`,
/// after which the idle timeout applies from the next operation on.
///
/// The wrapper never changes what the wrapped connection returns. Data, end of
/// stream and errors (`ErrorKind::TimedOut` included) are passed through as is.
///
/// The inherent [`read`](TimeoutConnection::read), [`write`](TimeoutConnection::write)
/// and [`write_all`](TimeoutConnection::write_all) are cancel safe. Through the
/// raw `AsyncRead`/`AsyncWrite` impls a read or write that is abandoned while
/// pending keeps its deadline armed until an explicit deadline call, so poll
/// level callers must drive each operation to completion.
///
/// All state changes happen inside `&mut self` calls, so there is one writer
/// per flag. Once the connection is split into halves the deadlines can no
/// longer be changed; callers that need that must guard the whole connection
/// with their own lock.
#[derive(Debug)]
pub struct TimeoutConnection<C> {
    inner: C,
    read_timeout: Duration,
    write_timeout: Duration,
    read_deadline_explicit: bool,
    write_deadline_explicit: bool,
    // A poll-based read spans several polls. The deadline is armed on the
    // first one only, otherwise the timer waking the task would re-arm it.
    reading: bool,
    writing: bool,
}

impl<C> TimeoutConnection<C>
where
    C: Connection,
{
    /// Wraps `inner`. Nothing is set on it until the first read or write.
    pub fn new(inner: C, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
            write_timeout,
            read_deadline_explicit: false,
            write_deadline_explicit: false,
            reading: false,
            writing: false,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Whether reads currently run under a caller-provided deadline.
    pub fn is_read_deadline_explicit(&self) -> bool {
        self.read_deadline_explicit
    }

    /// Whether writes currently run under a caller-provided deadline.
    pub fn is_write_deadline_explicit(&self) -> bool {
        self.write_deadline_explicit
    }

    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Reads into `buf` under a fresh idle deadline.
    ///
    /// Cancel safe: dropping the future before it completes forgets the armed
    /// deadline, so the next read starts a new one.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reading = false;
        let mut op = InFlight {
            conn: self,
            direction: Direction::Read,
        };
        let mut read_buf = ReadBuf::new(buf);
        poll_fn(|cx| Pin::new(&mut *op.conn).poll_read(cx, &mut read_buf)).await?;
        Ok(read_buf.filled().len())
    }

    /// Writes part of `buf` under a fresh idle deadline. Cancel safe like
    /// [`TimeoutConnection::read`].
    pub async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writing = false;
        let mut op = InFlight {
            conn: self,
            direction: Direction::Write,
        };
        poll_fn(|cx| Pin::new(&mut *op.conn).poll_write(cx, buf)).await
    }

    /// Writes all of `buf`, every partial write under its own idle deadline.
    pub async fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            let n = self.write(buf).await?;
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            buf = &buf[n..];
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Read,
    Write,
}

/// Disarms its direction when dropped, completed or not.
struct InFlight<'a, C> {
    conn: &'a mut TimeoutConnection<C>,
    direction: Direction,
}

impl<C> Drop for InFlight<'_, C> {
    fn drop(&mut self) {
        match self.direction {
            Direction::Read => self.conn.reading = false,
            Direction::Write => self.conn.writing = false,
        }
    }
}

impl<C> AsyncRead for TimeoutConnection<C>
where
    C: Connection,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.reading {
            if !this.read_deadline_explicit && !this.read_timeout.is_zero() {
                this.inner
                    .set_read_deadline(Some(Instant::now() + this.read_timeout))?;
            }
            this.reading = true;
        }
        let result = ready!(Pin::new(&mut this.inner).poll_read(cx, buf));
        this.reading = false;
        Poll::Ready(result)
    }
}

impl<C> AsyncWrite for TimeoutConnection<C>
where
    C: Connection,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.writing {
            if !this.write_deadline_explicit && !this.write_timeout.is_zero() {
                this.inner
                    .set_write_deadline(Some(Instant::now() + this.write_timeout))?;
            }
            this.writing = true;
        }
        let result = ready!(Pin::new(&mut this.inner).poll_write(cx, buf));
        this.writing = false;
        Poll::Ready(result)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl<C> Connection for TimeoutConnection<C>
where
    C: Connection,
{
    /// Sets an explicit read deadline, or with `None` hands reads back to the
    /// idle timeout.
    ///
    /// The explicit flag is recorded before the wrapped connection is asked,
    /// and stays recorded if it refuses.
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.read_deadline_explicit = deadline.is_some();
        self.reading = false;
        self.inner.set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.write_deadline_explicit = deadline.is_some();
        self.writing = false;
        self.inner.set_write_deadline(deadline)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }
}
