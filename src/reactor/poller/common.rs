/// I/O interests a connection can wait on.
///
/// The interest mask mirrors what the poller was last armed with for a
/// descriptor; it is re-applied before every suspension so the poller
/// always reflects what the connection is actually waiting for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    /// Waiting for the descriptor to become readable.
    pub(crate) const READABLE: Interest = Interest {
        read: true,
        write: false,
    };

    /// Waiting for the descriptor to become writable.
    pub(crate) const WRITABLE: Interest = Interest {
        read: false,
        write: true,
    };
}
