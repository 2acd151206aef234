//! Basic coroutine example
//!
//! Creates a few coroutines and drives them round-robin from `main` until
//! none is joinable.
//!
//! # Environment Variables
//!
//! - `COTHREAD_FLUSH_EPRINT=1` - Flush debug output immediately (useful for crash debugging)
//! - `COTHREAD_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `COTHREAD_DEBUG=1` - Log coroutine lifecycle events

use cothread::{kdebug, kinfo, this_coroutine, Builder, Coroutine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// COTHREAD_LOG_LEVEL=debug COTHREAD_FLUSH_EPRINT=1 cargo run -p cothread-basic
fn main() {
    println!("=== cothread Basic Example ===\n");

    let completed = Arc::new(AtomicUsize::new(0));
    let mut coroutines: Vec<Coroutine> = Vec::new();

    for i in 1..=3 {
        let c = completed.clone();
        let co = Builder::new()
            .name(format!("worker-{}", i))
            .spawn(move || {
                kdebug!("[worker {}] Started", i);

                for j in 0..3 {
                    println!(
                        "  {} iteration {}",
                        this_coroutine::name().unwrap_or_default(),
                        j
                    );
                    this_coroutine::yield_now();
                }

                kdebug!("[worker {}] Finished", i);
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_or_else(|e| panic!("failed to create worker {}: {}", i, e));
        println!("Created {:?}", co);
        coroutines.push(co);
    }

    println!("\nDriving {} coroutines...\n", coroutines.len());
    let mut rounds = 0;
    while coroutines.iter().any(Coroutine::joinable) {
        rounds += 1;
        kinfo!("round {}", rounds);
        for co in coroutines.iter_mut() {
            co.join();
        }
    }

    let count = completed.load(Ordering::SeqCst);
    kinfo!("{} coroutine(s) completed in {} rounds", count, rounds);
    println!("\n{} coroutine(s) completed in {} rounds", count, rounds);
    println!("\n=== Example Complete ===");
}
