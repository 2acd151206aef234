//! Nested coroutine example
//!
//! A generator-style coroutine that drives a child coroutine on the same
//! OS thread, showing that `this_coroutine::id()` tracks whoever is
//! actually running.

use cothread::{kinfo, this_coroutine, Builder, CoroutineId};
use std::sync::{Arc, Mutex};

fn main() {
    println!("=== cothread Nested Example ===\n");

    let values = Arc::new(Mutex::new(Vec::new()));
    let out = Arc::clone(&values);

    let mut parent = Builder::new()
        .name("parent")
        .spawn(move || {
            let me = this_coroutine::id();
            let child_out = Arc::clone(&out);
            let mut child = Builder::new()
                .name("child")
                .spawn(move || {
                    let (mut a, mut b) = (0u64, 1u64);
                    for _ in 0..8 {
                        child_out.lock().unwrap_or_else(|e| e.into_inner()).push(a);
                        (a, b) = (b, a + b);
                        this_coroutine::yield_now();
                    }
                })
                .unwrap_or_else(|e| panic!("failed to create child: {}", e));

            println!("parent {} drives child {}", me, child.id());
            while child.joinable() {
                child.join();
                assert_eq!(this_coroutine::id(), me);
                // Hand control back to main after every value
                this_coroutine::yield_now();
            }
            println!("parent {} done", me);
        })
        .unwrap_or_else(|e| panic!("failed to create parent: {}", e));

    let mut steps = 0;
    while parent.joinable() {
        parent.join();
        steps += 1;
        assert_eq!(this_coroutine::id(), CoroutineId::NONE);
    }

    let values = values.lock().unwrap_or_else(|e| e.into_inner());
    kinfo!("parent finished after {} joins", steps);
    println!("\nFibonacci from the child: {:?}", *values);
    println!("\n=== Example Complete ===");
}
