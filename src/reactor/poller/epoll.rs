//! Linux `epoll`-based poller implementation.
//!
//! This module provides the readiness monitor backing every event loop.
//! Descriptors are registered in **edge-triggered** mode (`EPOLLET`):
//! the kernel reports readiness only on the transition from not-ready to
//! ready, so consumers must drain a descriptor until it would block
//! before trusting a later notification.
//!
//! Responsibilities:
//! - Register file descriptors with read/write interests
//! - Switch the interest mask of a registered descriptor
//! - Block waiting for a batch of readiness events
//!
//! Each event loop owns exactly one poller; pollers are never shared.

use super::common::Interest;
use crate::reactor::event::Event;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLET, EPOLLHUP,
    EPOLLIN, EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Linux `epoll` poller.
///
/// Owns an `epoll` instance and a reusable event buffer. The registered
/// descriptor itself is used as the event token, so a readiness event
/// maps straight back to its connection.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,
}

impl EpollPoller {
    /// Creates a new `EpollPoller`.
    ///
    /// Failure here is a setup error and is surfaced to the caller
    /// before any event loop starts.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(64),
        })
    }

    fn mask(interest: Interest) -> u32 {
        let mut flags = EPOLLET as u32;

        if interest.read {
            flags |= EPOLLIN as u32;
        }
        if interest.write {
            flags |= EPOLLOUT as u32;
        }

        flags
    }

    /// Registers a file descriptor with the poller.
    ///
    /// Fails if the descriptor is invalid or already registered.
    pub(crate) fn register(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        let mut event = epoll_event {
            events: Self::mask(interest),
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Updates the interest mask of an already registered descriptor.
    ///
    /// Under edge-triggered semantics this also re-arms notification,
    /// so it is issued before every suspension even when the mask is
    /// unchanged.
    pub(crate) fn reregister(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        let mut event = epoll_event {
            events: Self::mask(interest),
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_MOD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Removes a file descriptor from the poller.
    ///
    /// Best-effort: closing the descriptor deregisters it anyway.
    pub(crate) fn deregister(&self, fd: RawFd) {
        unsafe {
            epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut());
        }
    }

    /// Polls for readiness events.
    ///
    /// Blocks until at least one registered descriptor becomes ready or
    /// the optional timeout expires; `None` blocks indefinitely. An
    /// interrupted wait is not an error and simply yields an empty batch.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        let timeout_ms = timeout.map(|t| t.as_millis() as i32).unwrap_or(-1);

        self.events.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        events.clear();

        for ev in &self.events {
            events.push(Event {
                fd: ev.u64 as RawFd,
                readable: ev.events & EPOLLIN as u32 != 0,
                writable: ev.events & EPOLLOUT as u32 != 0,
                closed: ev.events & (EPOLLERR | EPOLLHUP) as u32 != 0,
            });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket_pair() -> (RawFd, RawFd) {
        let mut fds = [0; 2];
        let rc = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "socketpair failed");
        (fds[0], fds[1])
    }

    fn close_pair(pair: (RawFd, RawFd)) {
        unsafe {
            libc::close(pair.0);
            libc::close(pair.1);
        }
    }

    #[test]
    fn reports_writable_then_readable() {
        let pair = socket_pair();
        let mut poller = EpollPoller::new().expect("epoll creation failed");
        let mut events = Vec::new();

        poller
            .register(pair.0, Interest::WRITABLE)
            .expect("register failed");

        poller
            .poll(&mut events, Some(Duration::from_secs(1)))
            .expect("poll failed");
        assert!(events.iter().any(|e| e.fd == pair.0 && e.writable));

        // Switch interest and feed data from the peer end.
        poller
            .reregister(pair.0, Interest::READABLE)
            .expect("reregister failed");

        let n = unsafe { libc::write(pair.1, b"ping".as_ptr() as *const _, 4) };
        assert_eq!(n, 4);

        poller
            .poll(&mut events, Some(Duration::from_secs(1)))
            .expect("poll failed");
        assert!(events.iter().any(|e| e.fd == pair.0 && e.readable));

        close_pair(pair);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let pair = socket_pair();
        let poller = EpollPoller::new().expect("epoll creation failed");

        poller
            .register(pair.0, Interest::READABLE)
            .expect("register failed");
        assert!(poller.register(pair.0, Interest::READABLE).is_err());

        close_pair(pair);
    }
}
