//! Platform I/O poller abstraction.
//!
//! The poller is the readiness monitor used by every event loop to:
//! - wait for edge-triggered I/O readiness events,
//! - register and re-arm descriptor interests,
//! - map kernel notifications back to connections.
//!
//! Only the Linux `epoll` backend is provided; portability to other
//! readiness primitives is deliberately out of scope.

pub(crate) mod common;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
