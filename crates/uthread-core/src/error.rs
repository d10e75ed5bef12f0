//! Error types for the uthread scheduler

use core::fmt;
use crate::id::ThreadId;

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur in scheduler and channel operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// No runtime is running on this OS thread
    NotInitialized,

    /// `run` was entered while the runtime was already running
    AlreadyRunning,

    /// Thread not found in the runtime's thread set
    ThreadNotFound(ThreadId),

    /// Invalid thread state for operation
    InvalidState,

    /// A channel wait queue reached its fixed capacity
    WaitQueueFull { capacity: usize },

    /// A blocking operation found no other runnable thread to hand control to
    NoRunnableThreads,

    /// Every remaining thread is blocked on a channel and none can be woken
    Deadlock { blocked: usize },

    /// Configuration rejected by validation
    InvalidConfig(&'static str),

    /// Stack allocation/mapping failed
    MemoryError(MemoryError),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::NotInitialized => write!(f, "no runtime running on this thread"),
            SchedError::AlreadyRunning => write!(f, "runtime already running"),
            SchedError::ThreadNotFound(id) => write!(f, "thread {} not found", id),
            SchedError::InvalidState => write!(f, "invalid thread state"),
            SchedError::WaitQueueFull { capacity } => {
                write!(f, "channel wait queue full (capacity {})", capacity)
            }
            SchedError::NoRunnableThreads => write!(f, "no runnable thread to switch to"),
            SchedError::Deadlock { blocked } => {
                write!(f, "deadlock: {} thread(s) blocked with nothing runnable", blocked)
            }
            SchedError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            SchedError::MemoryError(e) => write!(f, "memory error: {}", e),
        }
    }
}

impl std::error::Error for SchedError {}

/// Memory-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap failed
    AllocationFailed,

    /// mprotect failed
    ProtectionFailed,

    /// munmap failed
    ReleaseFailed,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "stack allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "guard page protection failed"),
            MemoryError::ReleaseFailed => write!(f, "stack release failed"),
        }
    }
}

impl From<MemoryError> for SchedError {
    fn from(e: MemoryError) -> Self {
        SchedError::MemoryError(e)
    }
}

/// Error returned when trying to send on a full channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrySendError<T>(pub T);

impl<T> TrySendError<T> {
    /// Recover the value that could not be sent
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel full")
    }
}

/// Error returned when trying to receive from an empty channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryRecvError;

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel empty")
    }
}
