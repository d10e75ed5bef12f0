//! # uthread - cooperative green threads
//!
//! Userspace threading on a single OS thread.
//!
//! ## Features
//!
//! - **Fixed stacks**: each thread owns an mmap'd stack with a guard page
//! - **Hand-written context switch**: callee-saved registers only, naked asm
//!   for x86_64 and aarch64
//! - **Round robin**: threads run until they yield or block, then the next
//!   ready thread in spawn order runs
//! - **Channels**: bounded buffers with direct rendezvous between blocked
//!   senders and receivers
//!
//! ## Quick Start
//!
//! ```ignore
//! use uthread::{channel, spawn, yield_now, Runtime, RuntimeConfig};
//!
//! fn main() -> uthread::SchedResult<()> {
//!     let mut runtime = Runtime::new(RuntimeConfig::from_env())?;
//!     let ch = channel::<u32>(0);
//!
//!     let tx = ch.clone();
//!     runtime.spawn(move || {
//!         for i in 1..=3 {
//!             tx.send(i).unwrap();
//!         }
//!     })?;
//!
//!     runtime.spawn(move || {
//!         for _ in 0..3 {
//!             println!("got {}", ch.recv().unwrap());
//!             yield_now();
//!         }
//!     })?;
//!
//!     runtime.run()
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │           spawn(), yield_now(), channel(), run()            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Runtime (scheduler)                        │
//! │    thread list, round robin, yield / block / wake           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┴───────────────────┐
//!          ▼                                       ▼
//!    ┌───────────────┐                    ┌────────────────┐
//!    │ arch::switch  │                    │  memory::Stack │
//!    │ (naked asm)   │                    │  mmap + guard  │
//!    └───────────────┘                    └────────────────┘
//! ```

// Re-export core types
pub use uthread_core::{
    ThreadId,
    ThreadState,
    SchedError,
    SchedResult,
    MemoryError,
    TrySendError,
    TryRecvError,
};

// Re-export kprint macros for debug logging
pub use uthread_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use uthread_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use uthread_core::{env_get, env_get_bool};

// Re-export runtime types
pub use uthread_runtime::{
    channel,
    Channel,
    Runtime,
    RuntimeConfig,
    spawn,
    yield_now,
    yield_thread,
    current_id,
    current_thread,
};

/// Check if currently executing within a runtime
#[inline]
pub fn in_runtime() -> bool {
    uthread_runtime::tls::in_runtime()
}
