//! x86_64 context switching implementation (System V AMD64 ABI)

use super::{thread_guard, EntryFn};
use crate::memory::Stack;
use uthread_core::constants::STACK_ALIGN;
use std::arch::naked_asm;

/// Saved callee-saved registers of a suspended thread
///
/// The instruction pointer is not stored: it sits on top of the saved
/// stack, pushed by the `call` into [`switch`].
///
/// Layout (offsets are used by [`switch`]):
/// ```text
/// 0x00: rsp
/// 0x08: r15
/// 0x10: r14
/// 0x18: r13
/// 0x20: r12
/// 0x28: rbx
/// 0x30: rbp
/// ```
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct Context {
    rsp: u64,
    r15: u64,
    r14: u64,
    r13: u64,
    r12: u64,
    rbx: u64,
    rbp: u64,
}

impl Context {
    /// Build the initial stack image of a new thread
    ///
    /// Writes, from the aligned top downwards, the guard address, a
    /// padding `ret` and `entry`:
    ///
    /// ```text
    /// top      ----------------  (16-byte aligned)
    /// top-8    | unused       |
    /// top-16   | thread_guard |  reached if the padding slot returns
    /// top-24   | skip         |  reached if `entry` returns
    /// top-32   | entry        |  <- rsp; popped by the first `ret` in switch
    /// ```
    ///
    /// After the first switch pops `entry`, rsp is 8 mod 16, as if `entry`
    /// had been reached by a `call`. All other registers start at zero.
    pub fn prepare(stack: &mut Stack, entry: EntryFn) -> Context {
        let top = (stack.top() as usize) & !(STACK_ALIGN - 1);
        assert!(
            top % STACK_ALIGN == 0 && stack.contains(top - 32),
            "stack too small or misaligned for initial frame"
        );

        let slots = top as *mut u64;
        unsafe {
            slots.sub(2).write(thread_guard as usize as u64);
            slots.sub(3).write(skip as usize as u64);
            slots.sub(4).write(entry as usize as u64);
        }

        Context {
            rsp: (top - 32) as u64,
            ..Default::default()
        }
    }

    /// Saved stack pointer
    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.rsp as usize
    }
}

/// Alignment padding: pops the next return address
#[unsafe(naked)]
unsafe extern "C" fn skip() {
    naked_asm!("ret");
}

/// Save callee-saved registers into `save_into`, load them from
/// `resume_from` and return into the loaded stack.
///
/// # Safety
///
/// Both pointers must be valid. `resume_from` must hold either a context
/// produced by [`Context::prepare`] or one saved by an earlier `switch`
/// whose stack is still alive.
#[unsafe(naked)]
pub unsafe extern "C" fn switch(_save_into: *mut Context, _resume_from: *const Context) {
    naked_asm!(
        // Save callee-saved registers to save_into (RDI)
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], r15",
        "mov [rdi + 0x10], r14",
        "mov [rdi + 0x18], r13",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], rbx",
        "mov [rdi + 0x30], rbp",
        // Load callee-saved registers from resume_from (RSI)
        "mov rsp, [rsi + 0x00]",
        "mov r15, [rsi + 0x08]",
        "mov r14, [rsi + 0x10]",
        "mov r13, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov rbx, [rsi + 0x28]",
        "mov rbp, [rsi + 0x30]",
        // Fresh thread: pops `entry`. Suspended thread: returns from its switch call.
        "ret",
    );
}
