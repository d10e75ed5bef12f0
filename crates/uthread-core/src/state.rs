//! Thread state types

use core::fmt;

/// State of a green thread
///
/// Terminated threads are removed from the runtime rather than tagged,
/// so there is no `Finished` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Currently executing; exactly one thread per runtime is in this state
    Running = 0,

    /// Runnable, waiting for its turn in the round robin
    Ready = 1,

    /// Parked in a channel's sender queue
    ChannelBlockSend = 2,

    /// Parked in a channel's receiver queue
    ChannelBlockRecv = 3,
}

impl ThreadState {
    /// Check if this state allows the thread to be selected by the scheduler
    #[inline]
    pub const fn is_runnable(&self) -> bool {
        matches!(self, ThreadState::Ready)
    }

    /// Check if the thread is waiting on a channel operation
    #[inline]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, ThreadState::ChannelBlockSend | ThreadState::ChannelBlockRecv)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadState::Running => write!(f, "RUNNING"),
            ThreadState::Ready => write!(f, "READY"),
            ThreadState::ChannelBlockSend => write!(f, "BLOCK_SEND"),
            ThreadState::ChannelBlockRecv => write!(f, "BLOCK_RECV"),
        }
    }
}
