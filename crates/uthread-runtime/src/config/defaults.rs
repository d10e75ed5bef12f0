//! Compile-time defaults
//!
//! Generated by `build.rs` from library defaults merged with the file named
//! by `UTHREAD_CONFIG_RS`, if any.

include!(concat!(env!("OUT_DIR"), "/uthread_merged_config.rs"));
