//! Thread-local pointer to the active runtime
//!
//! Set only while `Runtime::run` is on this OS thread's stack. Free
//! functions (`spawn`, `yield_now`, channel operations) find their
//! scheduler here.

use crate::scheduler::Core;
use std::cell::Cell;

thread_local! {
    static CURRENT_CORE: Cell<*mut Core> = const { Cell::new(std::ptr::null_mut()) };
}

/// Publish `core` as the active runtime, returning the one it replaces
#[inline]
pub(crate) fn enter(core: *mut Core) -> *mut Core {
    CURRENT_CORE.with(|cell| cell.replace(core))
}

/// Restore the runtime that was active before the matching `enter`
#[inline]
pub(crate) fn leave(previous: *mut Core) {
    CURRENT_CORE.with(|cell| cell.set(previous));
}

/// Active runtime on this OS thread, if any
#[inline]
pub(crate) fn current_core() -> Option<*mut Core> {
    let core = CURRENT_CORE.with(|cell| cell.get());
    if core.is_null() {
        None
    } else {
        Some(core)
    }
}

/// Check if we're running inside a runtime
#[inline]
pub fn in_runtime() -> bool {
    current_core().is_some()
}
