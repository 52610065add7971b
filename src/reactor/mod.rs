//! The event loop and its readiness plumbing.
//!
//! One `EventLoop` per worker thread drives every connection assigned
//! to it: it polls the readiness monitor, accepts on the shared
//! listener, and resumes suspended handlers. The suspension primitives
//! ([`future`]) and the poller backends ([`poller`]) live alongside it.

mod event;

pub(crate) mod core;
pub(crate) mod poller;

pub mod future;
