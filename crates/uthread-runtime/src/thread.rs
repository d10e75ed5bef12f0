//! Green thread record

use std::any::Any;

use crate::arch::{self, Context};
use crate::memory::Stack;
use uthread_core::error::SchedResult;
use uthread_core::id::ThreadId;
use uthread_core::state::ThreadState;

/// Entry closure of a spawned thread
pub(crate) type Entry = Box<dyn FnOnce()>;

/// One green thread
///
/// The driver (`ThreadId::MAIN`) has no stack of its own here: it runs on
/// the OS thread's stack, and its `ctx` is only a save slot.
pub(crate) struct Thread {
    pub(crate) id: ThreadId,
    pub(crate) state: ThreadState,
    pub(crate) ctx: Context,

    /// Owned stack; `None` for the driver
    stack: Option<Stack>,

    /// One-slot mailbox written by a sender that found us blocked in `recv`
    pub(crate) chan_val: Option<Box<dyn Any>>,

    /// Taken by the thread itself on its first run
    pub(crate) entry: Option<Entry>,
}

impl Thread {
    /// Record for the OS thread driving `run`
    pub(crate) fn main() -> Self {
        Self {
            id: ThreadId::MAIN,
            state: ThreadState::Running,
            ctx: Context::default(),
            stack: None,
            chan_val: None,
            entry: None,
        }
    }

    /// New `Ready` thread whose first resumption enters `start`
    pub(crate) fn spawned(
        id: ThreadId,
        stack_size: usize,
        start: arch::EntryFn,
        entry: Entry,
    ) -> SchedResult<Self> {
        let mut stack = Stack::new(stack_size)?;
        let ctx = Context::prepare(&mut stack, start);
        Ok(Self {
            id,
            state: ThreadState::Ready,
            ctx,
            stack: Some(stack),
            chan_val: None,
            entry: Some(entry),
        })
    }

    /// Usable stack bytes (0 for the driver)
    pub(crate) fn stack_size(&self) -> usize {
        self.stack.as_ref().map_or(0, Stack::size)
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("stack", &self.stack)
            .field("has_mail", &self.chan_val.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never_run() -> ! {
        unreachable!()
    }

    #[test]
    fn test_main_thread_has_no_stack() {
        let t = Thread::main();
        assert!(t.id.is_main());
        assert_eq!(t.state, ThreadState::Running);
        assert_eq!(t.stack_size(), 0);
    }

    #[test]
    fn test_spawned_thread_is_ready() {
        let t = Thread::spawned(ThreadId::new(1), 32 * 1024, never_run, Box::new(|| {})).unwrap();
        assert_eq!(t.state, ThreadState::Ready);
        assert!(t.stack_size() >= 32 * 1024);
        assert!(t.entry.is_some());
        assert!(t.chan_val.is_none());
    }
}
