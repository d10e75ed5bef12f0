//! # uthread-core
//!
//! Core types for the uthread cooperative scheduler.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Stacks, context switching and the scheduler itself live in
//! `uthread-runtime`.
//!
//! ## Modules
//!
//! - `id` - Thread identifier type
//! - `state` - Thread lifecycle states
//! - `error` - Error types
//! - `traits` - The scheduler interface channels are driven through
//! - `channel` - Rendezvous/buffered channel decision logic
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod error;
pub mod traits;
pub mod channel;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::ThreadId;
pub use state::ThreadState;
pub use error::{SchedError, SchedResult, MemoryError, TrySendError, TryRecvError};
pub use traits::SchedulerOps;
pub use channel::ChannelCore;
pub use env::{env_get, env_get_bool};

/// Constants for memory layout
pub mod constants {
    /// Smallest stack a thread may be given
    ///
    /// Formatting and panic machinery alone need a few KB, so anything
    /// below this is rejected by config validation.
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Largest stack a thread may be given (1 GB)
    pub const MAX_STACK_SIZE: usize = 1 << 30;

    /// Guard page size (4 KB)
    pub const GUARD_SIZE: usize = 4096;

    /// Stack alignment required by both supported ABIs
    pub const STACK_ALIGN: usize = 16;
}
