//! aarch64 context switching implementation (AAPCS64)

use super::{thread_guard, EntryFn};
use crate::memory::Stack;
use uthread_core::constants::STACK_ALIGN;
use std::arch::naked_asm;

/// Saved callee-saved registers of a suspended thread
///
/// `ret` jumps to `lr`, so unlike x86_64 the resume address lives in the
/// record rather than on the stack.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct Context {
    sp: u64,
    lr: u64,
    fp: u64,
    x19: u64,
    x20: u64,
    x21: u64,
    x22: u64,
    x23: u64,
    x24: u64,
    x25: u64,
    x26: u64,
    x27: u64,
    x28: u64,
    // Lower 64 bits of v8-v15
    d8: u64,
    d9: u64,
    d10: u64,
    d11: u64,
    d12: u64,
    d13: u64,
    d14: u64,
    d15: u64,
}

impl Context {
    /// Build the initial register state of a new thread
    ///
    /// The first switch loads `lr = entry` and returns into it with
    /// `sp` 16-byte aligned. A frame record `{fp: 0, lr: thread_guard}`
    /// sits at `sp` so unwinders stop there and a stray return lands in
    /// `thread_guard`.
    pub fn prepare(stack: &mut Stack, entry: EntryFn) -> Context {
        let top = (stack.top() as usize) & !(STACK_ALIGN - 1);
        let sp = top - 16;
        assert!(stack.contains(sp), "stack too small for initial frame");

        let record = sp as *mut u64;
        unsafe {
            record.write(0);
            record.add(1).write(thread_guard as usize as u64);
        }

        Context {
            sp: sp as u64,
            lr: entry as usize as u64,
            fp: sp as u64,
            ..Default::default()
        }
    }

    /// Saved stack pointer
    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.sp as usize
    }
}

/// Save callee-saved registers into `save_into`, load them from
/// `resume_from` and return to the loaded `lr`.
///
/// # Safety
///
/// Both pointers must be valid. `resume_from` must hold either a context
/// produced by [`Context::prepare`] or one saved by an earlier `switch`
/// whose stack is still alive.
#[unsafe(naked)]
pub unsafe extern "C" fn switch(_save_into: *mut Context, _resume_from: *const Context) {
    // x0 = save_into, x1 = resume_from
    naked_asm!(
        "mov x9, sp",
        "str x9,  [x0, #0x00]",
        "str lr,  [x0, #0x08]",
        "str fp,  [x0, #0x10]",
        "str x19, [x0, #0x18]",
        "str x20, [x0, #0x20]",
        "str x21, [x0, #0x28]",
        "str x22, [x0, #0x30]",
        "str x23, [x0, #0x38]",
        "str x24, [x0, #0x40]",
        "str x25, [x0, #0x48]",
        "str x26, [x0, #0x50]",
        "str x27, [x0, #0x58]",
        "str x28, [x0, #0x60]",
        "str d8,  [x0, #0x68]",
        "str d9,  [x0, #0x70]",
        "str d10, [x0, #0x78]",
        "str d11, [x0, #0x80]",
        "str d12, [x0, #0x88]",
        "str d13, [x0, #0x90]",
        "str d14, [x0, #0x98]",
        "str d15, [x0, #0xa0]",
        "ldr x9,  [x1, #0x00]",
        "mov sp, x9",
        "ldr lr,  [x1, #0x08]",
        "ldr fp,  [x1, #0x10]",
        "ldr x19, [x1, #0x18]",
        "ldr x20, [x1, #0x20]",
        "ldr x21, [x1, #0x28]",
        "ldr x22, [x1, #0x30]",
        "ldr x23, [x1, #0x38]",
        "ldr x24, [x1, #0x40]",
        "ldr x25, [x1, #0x48]",
        "ldr x26, [x1, #0x50]",
        "ldr x27, [x1, #0x58]",
        "ldr x28, [x1, #0x60]",
        "ldr d8,  [x1, #0x68]",
        "ldr d9,  [x1, #0x70]",
        "ldr d10, [x1, #0x78]",
        "ldr d11, [x1, #0x80]",
        "ldr d12, [x1, #0x88]",
        "ldr d13, [x1, #0x90]",
        "ldr d14, [x1, #0x98]",
        "ldr d15, [x1, #0xa0]",
        "ret",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never_run() -> ! {
        unreachable!("prepared context is never switched to in this test")
    }

    #[test]
    fn test_prepare_layout() {
        let mut stack = Stack::new(16 * 1024).unwrap();
        let ctx = Context::prepare(&mut stack, never_run);

        assert_eq!(ctx.stack_pointer() % 16, 0);
        assert_eq!(ctx.lr, never_run as usize as u64);
        assert_eq!(ctx.fp, ctx.sp);

        let record = ctx.stack_pointer() as *const u64;
        unsafe {
            assert_eq!(*record, 0);
            assert_eq!(*record.add(1), thread_guard as usize as u64);
        }
    }
}
