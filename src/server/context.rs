use crate::reactor::core::LoopShared;

use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    /// Thread-local handle to the event loop currently dispatching on
    /// this thread.
    ///
    /// Installed for the lifetime of a worker's dispatch loop so that
    /// the suspension primitives can re-arm descriptor interests
    /// without explicit parameter passing. Each worker thread has its
    /// own loop, so the handle never crosses threads.
    pub(crate) static CURRENT_LOOP: RefCell<Option<Rc<LoopShared>>> = const { RefCell::new(None) };
}

/// Enters the event-loop context for the current thread.
///
/// Installs `shared` as the thread's current loop for the duration of
/// the closure `f`, restoring the previous value afterwards.
pub(crate) fn enter<R>(shared: Rc<LoopShared>, f: impl FnOnce() -> R) -> R {
    CURRENT_LOOP.with(|cell| {
        let prev = cell.replace(Some(shared));

        let out = f();

        cell.replace(prev);
        out
    })
}

/// Runs `f` with the current loop handle.
///
/// # Panics
///
/// Panics if called outside of a running event loop (no loop in
/// context); connection I/O only makes sense inside a handler.
pub(crate) fn with_current<R>(f: impl FnOnce(&LoopShared) -> R) -> R {
    CURRENT_LOOP.with(|cell| {
        let binding = cell.borrow();
        let shared = binding.as_ref().expect("no event loop in context");

        f(shared)
    })
}
