//! Thread identifier type

use core::fmt;

/// Unique identifier for a green thread
///
/// Identifiers are minted by the runtime from a monotonically increasing
/// counter and are never reused while that runtime is alive. Id 0 is the
/// driver (the OS thread that called `run`); `u64::MAX` is reserved as a
/// sentinel for "no thread".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ThreadId(u64);

impl ThreadId {
    /// The driver thread of a runtime
    pub const MAIN: ThreadId = ThreadId(0);

    /// Sentinel value indicating no thread
    pub const NONE: ThreadId = ThreadId(u64::MAX);

    /// Create a new ThreadId from a raw value
    #[inline]
    pub const fn new(id: u64) -> Self {
        ThreadId(id)
    }

    /// Get the raw u64 value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this is the driver thread
    #[inline]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }

    /// Convert to Option
    #[inline]
    pub const fn to_option(self) -> Option<ThreadId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<ThreadId> for u64 {
    #[inline]
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ThreadId(NONE)")
        } else {
            write!(f, "ThreadId({})", self.0)
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else if self.is_main() {
            write!(f, "main")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        ThreadId::NONE
    }
}
