//! # Filament
//!
//! **Filament** is a small embeddable TCP server library. An
//! application expresses per-connection logic as straight-line code
//! using blocking-style `read` and `write` calls, while the library
//! multiplexes thousands of connections on a single OS thread per
//! worker using edge-triggered readiness notifications.
//!
//! Each worker is an independent, single-threaded event loop with its
//! own poller and connection table; workers share nothing but the
//! listening socket, and the kernel distributes accepted connections
//! among them. Within a worker there is no preemption: a handler runs
//! until it suspends inside `read`/`write` or returns, so its I/O
//! observes program order and no locks are needed anywhere in the
//! dispatch path.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filament::ServerBuilder;
//!
//! fn main() -> std::io::Result<()> {
//!     let server = ServerBuilder::new()
//!         .workers(4)
//!         .bind("0.0.0.0:9000")?;
//!
//!     // Echo every byte back to the peer.
//!     server.serve(|conn| async move {
//!         let mut buf = [0u8; 4096];
//!         loop {
//!             let n = conn.read(&mut buf).await?;
//!             if n == 0 {
//!                 return Ok(());
//!             }
//!             conn.write_all(&buf[..n]).await?;
//!         }
//!     })
//! }
//! ```
//!
//! ## Modules
//!
//! - [`net`]: the connection handle given to handlers and the socket
//!   type configuration
//!
//! The handler sees a raw byte stream: framing, protocols and timeouts
//! are its own concern. A connection terminates when the handler
//! returns, when `read` reports end-of-stream, or when the peer drops
//! the socket; in every case the descriptor is closed exactly once and
//! the connection's slot is released before it can be reused.

pub mod net;

mod reactor;
mod server;
mod utils;

pub use net::{Conn, SocketType};
pub use reactor::future::{ReadFuture, WriteAllFuture};
pub use server::{Server, ServerBuilder};

use std::future::Future;
use std::io;

/// Binds `port` and serves connections with `handler` on `workers`
/// independent event loops.
///
/// Blocks until all workers exit, which under normal operation is
/// never. Setup failures (address resolution, bind, listen, poller
/// creation) are returned before any worker starts.
pub fn serve<H, F>(port: u16, workers: usize, handler: H) -> io::Result<()>
where
    H: Fn(Conn) -> F + Send + Clone + 'static,
    F: Future<Output = io::Result<()>> + 'static,
{
    ServerBuilder::new()
        .workers(workers)
        .bind_port(port)?
        .serve(handler)
}
