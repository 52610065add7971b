use crate::reactor::future::{ReadFuture, WriteAllFuture};
use crate::reactor::poller::platform::sys_close;

use std::net::SocketAddr;
use std::os::fd::RawFd;

/// A live client connection, handed to the handler by the event loop.
///
/// `Conn` exposes blocking-style I/O over the non-blocking descriptor:
/// `read` and `write_all` are the handler's only suspension points.
/// Between them the handler runs uninterrupted, so reads and writes
/// observe program order.
///
/// The connection exclusively owns its descriptor. Whatever way the
/// handler exits (normal return, error propagation, or a panic), the
/// descriptor is closed exactly once when the handle is dropped.
pub struct Conn {
    fd: RawFd,
    peer: SocketAddr,
}

impl Conn {
    pub(crate) fn new(fd: RawFd, peer: SocketAddr) -> Self {
        Self { fd, peer }
    }

    /// The descriptor identifying this connection within its event loop.
    pub fn id(&self) -> RawFd {
        self.fd
    }

    /// The address of the connected peer, captured at accept time.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Reads up to `buffer.len()` bytes.
    ///
    /// Resolves to the number of bytes read; `Ok(0)` signals orderly
    /// end-of-stream after the peer closed. If no data is available the
    /// handler is suspended until the socket becomes readable again.
    pub fn read<'a>(&'a self, buffer: &'a mut [u8]) -> ReadFuture<'a> {
        ReadFuture::new(self.fd, buffer)
    }

    /// Writes the entire buffer.
    ///
    /// Suspends as often as needed while the socket send buffer is
    /// full; resolves to `Ok(())` only once every byte was accepted by
    /// the kernel, and to `Err` on any non-retryable failure.
    pub fn write_all<'a>(&'a self, buffer: &'a [u8]) -> WriteAllFuture<'a> {
        WriteAllFuture::new(self.fd, buffer)
    }
}

impl Drop for Conn {
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}
