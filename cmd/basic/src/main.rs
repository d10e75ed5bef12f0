//! Basic uthread example
//!
//! Spawns a few threads that each yield a few times, showing the round
//! robin order. One thread spawns a child while running.
//!
//! # Environment Variables
//!
//! - `UTHREAD_FLUSH_EPRINT=1` - Flush debug output immediately (useful for crash debugging)
//! - `UTHREAD_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `UTHREAD_STACK_SIZE=<bytes>` - Stack size per thread

use std::cell::Cell;
use std::rc::Rc;

use uthread::{current_id, kdebug, kerror, kinfo, spawn, yield_now, Runtime, RuntimeConfig};

// UTHREAD_LOG_LEVEL=debug UTHREAD_FLUSH_EPRINT=1 cargo run -p uthread-basic
fn main() {
    println!("=== uthread Basic Example ===\n");

    let config = RuntimeConfig::from_env();
    let mut runtime = match Runtime::new(config) {
        Ok(rt) => rt,
        Err(e) => {
            kerror!("failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    // Counter to track completed threads
    let completed = Rc::new(Cell::new(0usize));

    for i in 1..=3 {
        let c = Rc::clone(&completed);
        let spawned = runtime.spawn(move || {
            kdebug!("[worker {}] started", i);
            for j in 0..3 {
                println!("worker {} (t{}) iteration {}", i, current_id(), j);
                yield_now();
            }
            c.set(c.get() + 1);
        });
        match spawned {
            Ok(id) => println!("Spawned worker {} (ID={})", i, id),
            Err(e) => kerror!("spawn failed: {}", e),
        }
    }

    // A thread that spawns another from inside the runtime
    let c = Rc::clone(&completed);
    let spawned = runtime.spawn(move || {
        let child_done = Rc::clone(&c);
        match spawn(move || {
            println!("child (t{}) running", current_id());
            child_done.set(child_done.get() + 1);
        }) {
            Ok(id) => kinfo!("parent spawned child {}", id),
            Err(e) => kerror!("child spawn failed: {}", e),
        }
        c.set(c.get() + 1);
    });
    if let Err(e) = spawned {
        kerror!("spawn failed: {}", e);
    }

    println!("\nRunning {} threads...\n", runtime.len());
    if let Err(e) = runtime.run() {
        kerror!("run failed: {}", e);
        std::process::exit(1);
    }

    println!("\nCompleted: {}", completed.get());
    println!("Context switches: {}", runtime.context_switches());
    println!("\n=== Example Complete ===");
}
