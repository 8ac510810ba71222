use super::connection::{Connection, Endpoint};
use crate::errors::ConnectionError;
use futures::ready;
use std::{
    future::Future,
    io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll, Waker},
};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    time::{self, Instant, Sleep},
};

/// One direction's deadline.
#[derive(Debug, Default)]
struct Timer {
    deadline: Option<Instant>,
    /// Created on first use, so deadlines can be set outside of a runtime.
    sleep: Option<Pin<Box<Sleep>>>,
    /// The task parked on a pending operation in this direction.
    waker: Option<Waker>,
}

impl Timer {
    fn set(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    /// Returns `true` once the deadline has passed, otherwise registers `cx`
    /// to be woken when it does.
    fn poll_expired(&mut self, cx: &mut Context<'_>) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if Instant::now() >= deadline {
            return true;
        }
        let sleep = self
            .sleep
            .get_or_insert_with(|| Box::pin(time::sleep_until(deadline)));
        if sleep.deadline() != deadline {
            sleep.as_mut().reset(deadline);
        }
        sleep.as_mut().poll(cx).is_ready()
    }

    fn park(&mut self, cx: &Context<'_>) {
        self.waker = Some(cx.waker().clone());
    }
}

/// Gives a plain tokio stream read and write deadlines.
///
/// The stream itself is untouched: deadlines are enforced by a timer per
/// direction that races the pending operation. Once a deadline has passed,
/// every operation in that direction fails with `ErrorKind::TimedOut` until
/// the deadline is moved or cleared.
#[derive(Debug)]
pub struct DeadlineStream<S> {
    inner: S,
    read_timer: Timer,
    write_timer: Timer,
    write_closed: bool,
}

impl<S> DeadlineStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            read_timer: Timer::default(),
            write_timer: Timer::default(),
            write_closed: false,
        }
    }
}

impl<S> AsyncRead for DeadlineStream<S>
where
    S: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.read_timer.poll_expired(cx) {
            return Poll::Ready(Err(ConnectionError::DeadlineExceeded.into()));
        }
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Pending => {
                this.read_timer.park(cx);
                Poll::Pending
            }
            ready => ready,
        }
    }
}

impl<S> AsyncWrite for DeadlineStream<S>
where
    S: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.write_timer.poll_expired(cx) {
            return Poll::Ready(Err(ConnectionError::DeadlineExceeded.into()));
        }
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Pending => {
                this.write_timer.park(cx);
                Poll::Pending
            }
            ready => ready,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(Pin::new(&mut this.inner).poll_shutdown(cx))?;
        this.write_closed = true;
        Poll::Ready(Ok(()))
    }
}

impl<S> Connection for DeadlineStream<S>
where
    S: AsyncRead + AsyncWrite + Endpoint + Unpin,
{
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.read_timer.set(deadline);
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        if self.write_closed {
            return Err(ConnectionError::WriteClosed.into());
        }
        self.write_timer.set(deadline);
        Ok(())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }
}
