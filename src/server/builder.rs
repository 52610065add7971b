use super::core::Server;
use crate::net::{SocketType, listener};
use crate::reactor::poller::platform::sys_close;

use std::io;
use std::os::fd::IntoRawFd;

/// Builder for configuring and creating a [`Server`].
///
/// `ServerBuilder` allows customizing server parameters before binding
/// the endpoint: the number of worker event loops, the socket type and
/// the listen backlog.
///
/// # Examples
///
/// ```rust,ignore
/// let server = ServerBuilder::new()
///     .workers(4)
///     .bind("0.0.0.0:9000")?;
/// ```
pub struct ServerBuilder {
    /// Number of independent worker event loops.
    workers: usize,

    /// Kind of endpoint socket to open.
    socket_type: SocketType,

    /// Listen backlog passed to the kernel.
    backlog: i32,
}

impl ServerBuilder {
    /// Creates a new `ServerBuilder` with default configuration.
    ///
    /// Defaults to a single worker, a stream endpoint and the maximum
    /// backlog the OS advertises.
    pub fn new() -> Self {
        Self {
            workers: 1,
            socket_type: SocketType::Stream,
            backlog: libc::SOMAXCONN,
        }
    }

    /// Sets the number of worker event loops.
    ///
    /// Each worker is an independent single-threaded event loop with
    /// its own poller and connection table; the workers share nothing
    /// but the listening socket.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn workers(mut self, n: usize) -> Self {
        assert!(n > 0, "workers must be > 0");

        self.workers = n;
        self
    }

    /// Sets the kind of endpoint socket to open.
    ///
    /// Only [`SocketType::Stream`] is supported; requesting a datagram
    /// endpoint makes the bind step fail with
    /// [`io::ErrorKind::Unsupported`].
    pub fn socket_type(mut self, socket_type: SocketType) -> Self {
        self.socket_type = socket_type;
        self
    }

    /// Sets the listen backlog.
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Binds an explicit address such as `"127.0.0.1:0"`.
    pub fn bind(self, address: &str) -> io::Result<Server> {
        let fd = listener::bind_addr(address, self.socket_type, self.backlog)?;

        Ok(Server::from_parts(fd, self.workers))
    }

    /// Binds `port` on all interfaces, trying dual-stack IPv6 first.
    pub fn bind_port(self, port: u16) -> io::Result<Server> {
        let fd = listener::bind_port(port, self.socket_type, self.backlog)?;

        Ok(Server::from_parts(fd, self.workers))
    }

    /// Adopts a pre-opened standard listener.
    ///
    /// The listener is switched to non-blocking mode and served as-is;
    /// ownership of the descriptor moves to the returned server.
    pub fn listener(self, listener: std::net::TcpListener) -> io::Result<Server> {
        let fd = listener.into_raw_fd();

        match listener::adopt(fd, self.backlog) {
            Ok(fd) => Ok(Server::from_parts(fd, self.workers)),
            Err(err) => {
                sys_close(fd);
                Err(err)
            }
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
