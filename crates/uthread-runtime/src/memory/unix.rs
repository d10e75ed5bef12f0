//! Unix stack implementation using mmap

use super::{round_up, Stack};
use nix::sys::mman::{mmap_anonymous, mprotect, munmap, MapFlags, ProtFlags};
use std::num::NonZeroUsize;
use uthread_core::constants::GUARD_SIZE;
use uthread_core::error::{MemoryError, SchedResult};
use uthread_core::kwarn;

/// System page size, falling back to 4 KB if sysconf fails
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        GUARD_SIZE
    } else {
        size as usize
    }
}

impl Stack {
    /// Map a new stack with at least `size` usable bytes
    ///
    /// The usable size is rounded up to whole pages and one PROT_NONE guard
    /// page is placed below it.
    pub fn new(size: usize) -> SchedResult<Stack> {
        let page = page_size();
        let mapped = round_up(size.max(1), page)
            .and_then(|usable| usable.checked_add(page))
            .and_then(NonZeroUsize::new)
            .ok_or(MemoryError::AllocationFailed)?;

        let base = unsafe {
            mmap_anonymous(
                None,
                mapped,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE,
            )
        }
        .map_err(|_| MemoryError::AllocationFailed)?;

        // Guard page at the low end; overflow runs into it
        if unsafe { mprotect(base, page, ProtFlags::PROT_NONE) }.is_err() {
            let _ = unsafe { munmap(base, mapped.get()) };
            return Err(MemoryError::ProtectionFailed.into());
        }

        Ok(Stack {
            base: base.cast(),
            mapped: mapped.get(),
            guard: page,
        })
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        if unsafe { munmap(self.base.cast(), self.mapped) }.is_err() {
            kwarn!("{}: {:?}", MemoryError::ReleaseFailed, self);
        }
    }
}
