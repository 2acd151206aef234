//! Sleep example
//!
//! Coroutines sleep for different durations. `main` is the only scheduler:
//! it joins whichever coroutine has the earliest deadline, sleeping the OS
//! thread until then instead of spinning.

use cothread::{kinfo, this_coroutine, Coroutine};
use std::time::{Duration, Instant};

fn main() {
    println!("=== cothread Sleep Example ===\n");

    let start = Instant::now();
    let mut coroutines: Vec<Coroutine> = [30u64, 10, 20]
        .into_iter()
        .map(|ms| {
            Coroutine::new(move || {
                for tick in 1..=3 {
                    this_coroutine::sleep_ms(ms);
                    println!(
                        "  [{:>4} ms] coroutine {} (period {} ms) tick {}",
                        start.elapsed().as_millis(),
                        this_coroutine::id(),
                        ms,
                        tick
                    );
                }
            })
        })
        .collect();

    let mut joins = 0u32;
    while coroutines.iter().any(Coroutine::joinable) {
        let next = coroutines
            .iter()
            .filter(|co| co.joinable())
            .filter_map(Coroutine::deadline)
            .min();
        if let Some(deadline) = next {
            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
        }
        for co in coroutines.iter_mut() {
            if co.joinable() && co.deadline().is_none_or(|d| d <= Instant::now()) {
                co.join();
                joins += 1;
            }
        }
    }

    kinfo!("all sleepers done after {} joins", joins);
    println!(
        "\nAll sleepers done in {:?} with {} joins",
        start.elapsed(),
        joins
    );
    assert!(start.elapsed() >= Duration::from_millis(90));
    println!("\n=== Example Complete ===");
}
