use super::builder::ServerBuilder;
use crate::net::Conn;
use crate::reactor::core::{ConnFuture, EventLoop, HandlerFn};
use crate::reactor::poller::Poller;
use crate::reactor::poller::platform::{sys_close, sys_sockname};

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::thread;

/// A bound, not-yet-running server.
///
/// `Server` owns the listening descriptor. Calling
/// [`serve`](Self::serve) spawns the configured number of worker event
/// loops, each with its own poller and connection table, all accepting
/// on this one socket, and blocks until every worker has exited, which
/// under normal operation is never.
#[derive(Debug)]
pub struct Server {
    listener: RawFd,
    workers: usize,
}

impl Server {
    pub(crate) fn from_parts(listener: RawFd, workers: usize) -> Self {
        Self { listener, workers }
    }

    /// Binds an explicit address with default configuration.
    ///
    /// Shorthand for `ServerBuilder::new().bind(address)`.
    pub fn bind(address: &str) -> io::Result<Self> {
        ServerBuilder::new().bind(address)
    }

    /// Binds `port` on all interfaces with default configuration.
    pub fn bind_port(port: u16) -> io::Result<Self> {
        ServerBuilder::new().bind_port(port)
    }

    /// Adopts a pre-opened standard listener with default configuration.
    pub fn from_listener(listener: std::net::TcpListener) -> io::Result<Self> {
        ServerBuilder::new().listener(listener)
    }

    /// Returns the locally bound address.
    ///
    /// Useful after binding port `0` to discover the assigned port.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        sys_sockname(self.listener)
    }

    /// Runs the server with `handler` driving every connection.
    ///
    /// The handler is invoked once per accepted connection and runs as
    /// straight-line code; its `read`/`write` awaits are the only
    /// points where it suspends. Handler futures never leave their
    /// worker thread, so they need not be `Send`.
    ///
    /// Setup failures (poller creation) are returned before any worker
    /// starts. Once running, `serve` blocks until all workers exit and
    /// returns the first worker error, if any.
    pub fn serve<H, F>(self, handler: H) -> io::Result<()>
    where
        H: Fn(Conn) -> F + Send + Clone + 'static,
        F: Future<Output = io::Result<()>> + 'static,
    {
        // Create every poller up front so monitor setup errors surface
        // here instead of inside a detached worker.
        let mut pollers = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            pollers.push(Poller::new()?);
        }

        let fd = self.listener;
        let mut threads = Vec::with_capacity(self.workers);

        for (id, poller) in pollers.into_iter().enumerate() {
            let handler = handler.clone();
            threads.push(thread::spawn(move || run_worker(id, fd, poller, handler)));
        }

        let mut first_err = None;
        for thread in threads {
            match thread.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
                Err(_) => {
                    if first_err.is_none() {
                        first_err = Some(io::Error::other("worker thread panicked"));
                    }
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        sys_close(self.listener);
    }
}

fn run_worker<H, F>(id: usize, listener: RawFd, poller: Poller, handler: H) -> io::Result<()>
where
    H: Fn(Conn) -> F + 'static,
    F: Future<Output = io::Result<()>> + 'static,
{
    let factory: Rc<HandlerFn> = Rc::new(move |conn| -> ConnFuture { Box::pin(handler(conn)) });

    let mut event_loop = EventLoop::new(listener, poller, factory);

    log::trace!("worker {id} started");
    let result = event_loop.run();
    if let Err(ref err) = result {
        log::error!("worker {id} exited: {err}");
    }

    result
}
