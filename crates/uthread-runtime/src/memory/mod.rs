//! Thread stack memory
//!
//! Each spawned thread owns one `Stack`: a fixed-size anonymous mapping
//! with a guard page at its low end, so an overflow faults instead of
//! silently corrupting a neighbour. Stacks are never resized and are
//! unmapped when dropped.
//!
//! ```text
//! bottom()-guard    bottom()                              top()
//!   |   PROT_NONE    |          usable stack (grows down)   |
//!   +----------------+--------------------------------------+
//! ```

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::page_size;
    } else {
        compile_error!("uthread stacks are only implemented for unix targets");
    }
}

use std::ptr::NonNull;

/// Owned, fixed-size stack region
pub struct Stack {
    /// Base address of the mapping (start of the guard page)
    base: NonNull<u8>,

    /// Total mapped size, guard included
    mapped: usize,

    /// Guard size at the low end
    guard: usize,
}

impl Stack {
    /// Lowest usable address
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(self.guard) }
    }

    /// One past the highest usable address (stack grows down from here)
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(self.mapped) }
    }

    /// Usable size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.mapped - self.guard
    }

    /// Check whether `addr` lies in the usable part of this stack
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.bottom() as usize && addr < self.top() as usize
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .field("size", &self.size())
            .finish()
    }
}

/// Round `n` up to a multiple of `align` (a power of two); `None` on overflow
#[inline]
pub(crate) const fn round_up(n: usize, align: usize) -> Option<usize> {
    match n.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}
