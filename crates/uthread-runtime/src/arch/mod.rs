//! Architecture-specific context switching
//!
//! Each architecture provides the same three things:
//! - `Context`, the callee-saved register record of a suspended thread
//! - `Context::prepare`, which builds a fresh thread's initial stack image
//! - `switch(save_into, resume_from)`, the only code that moves the CPU
//!   from one stack to another

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
        pub use x86_64::{switch, Context};
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
        pub use aarch64::{switch, Context};
    } else {
        compile_error!("uthread supports only x86_64 and aarch64");
    }
}

/// First code a new thread runs; never returns
pub type EntryFn = extern "C" fn() -> !;

/// Called if a thread's entry ever returns into its prepared frame
extern "C" fn thread_guard() -> ! {
    crate::scheduler::exit_current()
}
