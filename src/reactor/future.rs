use crate::reactor::poller::common::Interest;
use crate::reactor::poller::platform::{sys_read, sys_write};
use crate::server::context;

use std::future::Future;
use std::io;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Asynchronous read on a connected descriptor.
///
/// Attempts the non-blocking `read(2)` immediately. If the kernel
/// reports would-block, the future re-arms the connection's interest to
/// readable and suspends; the event loop resumes it on the next edge and
/// the read is retried. Because notifications are edge-triggered, the
/// syscall is always reissued after a resume rather than trusting the
/// event.
///
/// Resolves to the number of bytes read; `Ok(0)` is orderly
/// end-of-stream. Any other failure resolves to `Err` and terminates
/// the connection when the handler propagates it.
pub struct ReadFuture<'a> {
    fd: RawFd,
    buffer: &'a mut [u8],
}

impl<'a> ReadFuture<'a> {
    pub(crate) fn new(fd: RawFd, buffer: &'a mut [u8]) -> Self {
        Self { fd, buffer }
    }
}

impl Future for ReadFuture<'_> {
    type Output = io::Result<usize>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match sys_read(this.fd, this.buffer) {
                Ok(n) => return Poll::Ready(Ok(n)),

                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    context::with_current(|ev| ev.rearm(this.fd, Interest::READABLE));
                    return Poll::Pending;
                }

                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,

                Err(err) => return Poll::Ready(Err(err)),
            }
        }
    }
}

/// Asynchronous whole-buffer write on a connected descriptor.
///
/// Writes the entire buffer or fails. Partial writes advance an
/// internal cursor; when the kernel reports would-block the future
/// re-arms the connection's interest to writable and suspends, resuming
/// on the next edge to continue from the cursor.
///
/// A zero return from `write(2)` resolves to `ErrorKind::WriteZero`;
/// non-retryable errors resolve to `Err`.
pub struct WriteAllFuture<'a> {
    fd: RawFd,
    buffer: &'a [u8],
    written: usize,
}

impl<'a> WriteAllFuture<'a> {
    pub(crate) fn new(fd: RawFd, buffer: &'a [u8]) -> Self {
        Self {
            fd,
            buffer,
            written: 0,
        }
    }
}

impl Future for WriteAllFuture<'_> {
    type Output = io::Result<()>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        while this.written < this.buffer.len() {
            match sys_write(this.fd, &this.buffer[this.written..]) {
                Ok(0) => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "write returned zero bytes",
                    )));
                }

                Ok(n) => this.written += n,

                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    context::with_current(|ev| ev.rearm(this.fd, Interest::WRITABLE));
                    return Poll::Pending;
                }

                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,

                Err(err) => return Poll::Ready(Err(err)),
            }
        }

        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::task::Waker;

    fn socket_pair() -> (RawFd, RawFd) {
        let mut fds = [0; 2];
        let rc = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "socketpair failed");
        (fds[0], fds[1])
    }

    #[test]
    fn read_resolves_immediately_when_data_is_buffered() {
        let (a, b) = socket_pair();
        let n = unsafe { libc::write(b, b"hi".as_ptr() as *const _, 2) };
        assert_eq!(n, 2);

        let mut cx = Context::from_waker(Waker::noop());

        let mut buf = [0u8; 8];
        let mut future = ReadFuture::new(a, &mut buf);

        match Pin::new(&mut future).poll(&mut cx) {
            Poll::Ready(Ok(2)) => {}
            other => panic!("unexpected poll result: {other:?}"),
        }
        assert_eq!(&buf[..2], b"hi");

        unsafe {
            libc::close(a);
            libc::close(b);
        }
    }

    #[test]
    fn read_reports_end_of_stream_after_peer_close() {
        let (a, b) = socket_pair();
        unsafe { libc::close(b) };

        let mut cx = Context::from_waker(Waker::noop());

        let mut buf = [0u8; 8];
        let mut future = ReadFuture::new(a, &mut buf);

        match Pin::new(&mut future).poll(&mut cx) {
            Poll::Ready(Ok(0)) => {}
            other => panic!("unexpected poll result: {other:?}"),
        }

        unsafe { libc::close(a) };
    }

    #[test]
    fn write_completes_in_one_poll_when_buffer_fits() {
        let (a, b) = socket_pair();

        let mut cx = Context::from_waker(Waker::noop());

        let mut future = WriteAllFuture::new(a, b"pong");
        match Pin::new(&mut future).poll(&mut cx) {
            Poll::Ready(Ok(())) => {}
            other => panic!("unexpected poll result: {other:?}"),
        }

        let mut buf = [0u8; 8];
        let n = unsafe { libc::read(b, buf.as_mut_ptr() as *mut _, buf.len()) };
        assert_eq!(n, 4);
        assert_eq!(&buf[..4], b"pong");

        unsafe {
            libc::close(a);
            libc::close(b);
        }
    }
}
