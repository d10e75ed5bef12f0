//! Channel communication example
//!
//! Thread A sends 1, 2, 3 over an unbuffered channel; thread B receives
//! and prints them. Every transfer is a rendezvous, so the two threads
//! alternate.
//!
//! # Environment Variables
//!
//! - `UTHREAD_LOG_LEVEL=debug` - Show the producer/consumer trace
//! - `UTHREAD_DEBUG=1` - Log spawn, exit and run transitions

use uthread::{channel, current_id, kdebug, kerror, Runtime, RuntimeConfig};

// UTHREAD_LOG_LEVEL=debug cargo run -p uthread-channel
fn main() {
    println!("=== uthread Channel Example ===\n");

    let mut runtime = match Runtime::new(RuntimeConfig::from_env()) {
        Ok(rt) => rt,
        Err(e) => {
            kerror!("failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    let ch = channel::<i32>(0);
    println!("Created rendezvous channel (capacity 0)\n");

    let tx = ch.clone();
    let spawned = runtime
        .spawn(move || {
            for i in 1..=3 {
                kdebug!("[A] sending {}", i);
                if let Err(e) = tx.send(i) {
                    kerror!("[A] send failed: {}", e);
                    return;
                }
            }
            kdebug!("[A] done");
        })
        .and_then(|_| {
            runtime.spawn(move || {
                for _ in 0..3 {
                    match ch.recv() {
                        Ok(v) => println!("[B t{}] received {}", current_id(), v),
                        Err(e) => {
                            kerror!("[B] recv failed: {}", e);
                            return;
                        }
                    }
                }
                kdebug!("[B] done");
            })
        });

    if let Err(e) = spawned {
        kerror!("spawn failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = runtime.run() {
        kerror!("run failed: {}", e);
        std::process::exit(1);
    }

    println!("\nThreads left: {}", runtime.len());
    println!("Context switches: {}", runtime.context_switches());
    println!("\n=== Example Complete ===");
}
