use crate::net::Conn;
use crate::reactor::event::Event;
use crate::reactor::poller::Poller;
use crate::reactor::poller::common::Interest;
use crate::reactor::poller::platform::{sys_accept, sys_close};
use crate::server::context;
use crate::utils::ConnTable;

use std::cell::RefCell;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// A suspended per-connection handler.
pub(crate) type ConnFuture = Pin<Box<dyn Future<Output = io::Result<()>>>>;

/// Type-erased handler factory: turns an accepted connection into its
/// handler future.
pub(crate) type HandlerFn = dyn Fn(Conn) -> ConnFuture;

/// Loop state reachable from inside a running handler.
///
/// The suspension primitives re-arm descriptor interests through this
/// handle (installed as the thread's current loop for the duration of
/// the dispatch). Everything here is confined to the loop's own thread.
pub(crate) struct LoopShared {
    poller: RefCell<Poller>,
}

impl LoopShared {
    /// Re-arms the interest mask for `fd` ahead of a suspension.
    pub(crate) fn rearm(&self, fd: RawFd, interest: Interest) {
        if let Err(err) = self.poller.borrow_mut().reregister(fd, interest) {
            log::warn!("failed to re-arm fd {fd}: {err}");
        }
    }
}

/// A single-threaded event loop.
///
/// Owns the poller, the connection table and all handler futures for
/// one worker. Nothing in here is shared with other workers; the only
/// common resource is the listening descriptor, which every worker
/// registers in its own poller and the kernel arbitrates.
pub(crate) struct EventLoop {
    listener: RawFd,
    handler: Rc<HandlerFn>,
    shared: Rc<LoopShared>,
    conns: ConnTable<ConnFuture>,
    events: Vec<Event>,
}

impl EventLoop {
    pub(crate) fn new(listener: RawFd, poller: Poller, handler: Rc<HandlerFn>) -> Self {
        Self {
            listener,
            handler,
            shared: Rc::new(LoopShared {
                poller: RefCell::new(poller),
            }),
            conns: ConnTable::new(64),
            events: Vec::with_capacity(64),
        }
    }

    /// Runs the loop until a poll failure.
    ///
    /// Under normal operation this never returns.
    pub(crate) fn run(&mut self) -> io::Result<()> {
        self.shared
            .poller
            .borrow_mut()
            .register(self.listener, Interest::READABLE)?;

        let shared = self.shared.clone();
        context::enter(shared, || self.dispatch())
    }

    fn dispatch(&mut self) -> io::Result<()> {
        loop {
            if let Err(err) = self
                .shared
                .poller
                .borrow_mut()
                .poll(&mut self.events, None)
            {
                log::error!("poll failed: {err}");
                return Err(err);
            }

            // Events are handled in the order the poller reported them.
            let batch: Vec<Event> = self.events.drain(..).collect();
            for event in batch {
                if event.fd == self.listener {
                    self.accept_ready();
                } else {
                    log::trace!(
                        "fd {} ready (readable={}, writable={}, closed={})",
                        event.fd,
                        event.readable,
                        event.writable,
                        event.closed
                    );
                    self.resume(event.fd);
                }
            }
        }
    }

    /// Drains the accept queue.
    ///
    /// The listener is edge-triggered, so accepting must continue until
    /// the kernel reports would-block. Transient failures are skipped;
    /// anything else is logged and the listener kept alive.
    fn accept_ready(&mut self) {
        loop {
            match sys_accept(self.listener) {
                Ok((fd, peer)) => self.install(fd, peer),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::ConnectionAborted => continue,
                Err(err) => {
                    log::warn!("accept failed: {err}");
                    break;
                }
            }
        }
    }

    /// Installs a freshly accepted connection and performs its first
    /// resume, which may run straight through to completion.
    fn install(&mut self, fd: RawFd, peer: SocketAddr) {
        if let Err(err) = self
            .shared
            .poller
            .borrow_mut()
            .register(fd, Interest::READABLE)
        {
            log::warn!("failed to register fd {fd}: {err}");
            sys_close(fd);
            return;
        }

        let future = (self.handler)(Conn::new(fd, peer));

        self.conns.insert(fd as usize, future);
        log::trace!("fd {fd} accepted from {peer} ({} live)", self.conns.len());

        self.resume(fd);
    }

    /// Resumes the handler bound to `fd`, if it is still live.
    ///
    /// A stale descriptor (evicted earlier in the same batch) is
    /// silently skipped. A panicking handler is contained here: its
    /// connection is evicted and nothing propagates to the loop or to
    /// other connections.
    fn resume(&mut self, fd: RawFd) {
        let Some(future) = self.conns.get_mut(fd as usize) else {
            return;
        };

        // Resumption is driven by poller events alone: the suspension
        // primitives re-arm their descriptor and the next edge lands
        // back here, so the task waker has nothing to do.
        let mut cx = Context::from_waker(Waker::noop());
        let polled = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

        match polled {
            Ok(Poll::Pending) => {}
            Ok(Poll::Ready(Ok(()))) => self.evict(fd),
            Ok(Poll::Ready(Err(err))) => {
                log::debug!("connection on fd {fd} terminated: {err}");
                self.evict(fd);
            }
            Err(_) => {
                log::error!("handler for fd {fd} panicked");
                self.evict(fd);
            }
        }
    }

    /// Removes a finished connection.
    ///
    /// The descriptor leaves the poller and the table slot is cleared
    /// before dispatch continues, so a later accept may reuse the
    /// descriptor number safely. Dropping the handler future drops the
    /// connection handle with it, which closes the descriptor.
    fn evict(&mut self, fd: RawFd) {
        self.shared.poller.borrow_mut().deregister(fd);
        self.conns.remove(fd as usize);
        log::trace!("fd {fd} evicted ({} live)", self.conns.len());
    }
}
