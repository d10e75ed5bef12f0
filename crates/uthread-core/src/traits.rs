//! Scheduler interface
//!
//! This trait is the seam between the platform-agnostic channel logic and
//! the runtime that owns threads and performs context switches. Everything
//! a channel needs from a scheduler goes through here, which lets the
//! channel protocol be driven by a scripted scheduler in tests.

use core::any::Any;
use crate::id::ThreadId;
use crate::state::ThreadState;

/// Operations a channel may perform on the scheduler that runs it
///
/// All methods take `&self`: implementations are single-threaded and use
/// interior mutability. Implementations must not hold any borrow across
/// `yield_thread`, because other threads run before it returns.
pub trait SchedulerOps {
    /// Identity of the thread currently executing
    fn current_thread(&self) -> ThreadId;

    /// Move `id` into a channel-blocked state
    fn mark_blocked(&self, id: ThreadId, state: ThreadState);

    /// Make a blocked thread selectable again
    fn mark_ready(&self, id: ThreadId);

    /// Restore the current thread to `Running` after a block was abandoned
    fn mark_running(&self, id: ThreadId);

    /// Hand control to the next ready thread
    ///
    /// Returns `false` without switching when no other thread is ready.
    fn yield_thread(&self) -> bool;

    /// Place a value in a thread's one-slot mailbox
    fn deliver(&self, id: ThreadId, value: Box<dyn Any>);

    /// Take the value (if any) from a thread's mailbox
    fn take_delivery(&self, id: ThreadId) -> Option<Box<dyn Any>>;
}
