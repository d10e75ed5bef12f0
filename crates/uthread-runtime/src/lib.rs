//! # uthread-runtime
//!
//! Platform-specific runtime implementation for the uthread scheduler.
//!
//! This crate provides:
//! - Stack memory (mmap with a guard page)
//! - Context switching (architecture-specific naked assembly)
//! - The cooperative round-robin scheduler and its `Runtime` handle
//! - Channels bound to the active runtime
//! - Configuration with build-time and environment overrides

pub mod config;
pub mod memory;
pub mod arch;
pub mod scheduler;
pub mod channel;
pub mod tls;
mod thread;

// Re-exports
pub use config::RuntimeConfig;
pub use scheduler::{current_id, current_thread, spawn, yield_now, yield_thread, Runtime};
pub use channel::{channel, Channel};
pub use memory::Stack;

// Architecture detection
cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub use arch::x86_64 as current_arch;
    } else if #[cfg(target_arch = "aarch64")] {
        pub use arch::aarch64 as current_arch;
    }
}
