use std::os::fd::RawFd;

/// An I/O event reported by the poller.
///
/// An `Event` carries readiness information for a registered file
/// descriptor. It is produced by the poller and consumed by the event
/// loop to resume the right connection.
pub(crate) struct Event {
    /// Descriptor the event refers to.
    ///
    /// The descriptor doubles as the registration token, so it maps
    /// straight back to a connection table slot (or the listener).
    pub(crate) fd: RawFd,

    /// The descriptor is readable.
    pub(crate) readable: bool,

    /// The descriptor is writable.
    pub(crate) writable: bool,

    /// The peer hung up or the descriptor is in an error state.
    ///
    /// The connection is still resumed normally: its in-flight read or
    /// write observes the failure and the handler unwinds through its
    /// usual exit path.
    pub(crate) closed: bool,
}
