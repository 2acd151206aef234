//! # cothread - Stackful Cooperative Coroutines
//!
//! Run a closure on its own stack and drive it step by step.
//!
//! ## Features
//!
//! - **Stackful**: suspend from any depth of the call stack, not only from
//!   the top-level closure
//! - **Owner-driven**: nothing runs until the owner calls `join()`, and
//!   each `join()` runs the body only to its next suspension
//! - **Fast switch**: callee-saved registers swapped with hand-written
//!   assembly on x86_64 and aarch64; a portable thread hand-off elsewhere
//! - **Guarded stacks**: mmap'd stacks with an inaccessible guard page
//! - **Panic propagation**: a panic in the body re-raises from `join()`
//!
//! ## Quick Start
//!
//! ```ignore
//! use cothread::{Coroutine, this_coroutine};
//! use std::time::Duration;
//!
//! let mut co = Coroutine::new(|| {
//!     println!("hello from {}", this_coroutine::id());
//!     this_coroutine::yield_now();
//!     this_coroutine::sleep_for(Duration::from_millis(10));
//!     println!("done");
//! });
//!
//! while co.joinable() {
//!     co.join();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │        Coroutine::new / join,  this_coroutine::*            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Coroutine handle + trampoline                 │
//! │      state, id, panic capture, per-thread registry          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┴───────────────────┐
//!          ▼                                       ▼
//!    ┌───────────────────┐                 ┌───────────────────┐
//!    │ Execution context │                 │   Stack           │
//!    │ asm / thread      │                 │   mmap + guard    │
//!    └───────────────────┘                 └───────────────────┘
//! ```
//!
//! ## Dropping a handle
//!
//! A handle that is still `Created` or `Suspended` owns a body that has
//! not finished. Dropping it (or assigning over it) is a fatal error: the
//! process logs the coroutine id and aborts. Join every coroutine until
//! `joinable()` is false.

// Re-export core types
pub use cothread_core::{CoroError, CoroResult, CoroutineId, CoroutineState, MemoryError};
pub use cothread_core::constants;

// Re-export kprint macros for debug logging
pub use cothread_core::{kdebug, kerror, kinfo, kprint, kprintln, ktrace, kwarn};
pub use cothread_core::kprint::{
    init as init_logging, set_flush_enabled, set_log_level, set_time_enabled, LogLevel,
};

// Re-export env utilities
pub use cothread_core::{env_get, env_get_bool, env_get_opt, env_get_size};

// Re-export runtime types
pub use cothread_runtime::{Builder, Coroutine, CoroutineConfig, MACHINE_CONTEXT};

/// Create a coroutine running `f`
///
/// Shorthand for [`Coroutine::new`]; the body starts on the first
/// `join()`.
///
/// # Panics
///
/// Panics if the stack cannot be allocated.
pub fn spawn<F>(f: F) -> Coroutine
where
    F: FnOnce() + Send + 'static,
{
    Coroutine::new(f)
}

/// Operations on the coroutine running on the calling thread
///
/// Every function is a no-op outside a coroutine body: `id()` returns
/// `CoroutineId::NONE` and the suspending functions return immediately.
pub mod this_coroutine {
    use super::CoroutineId;
    use std::time::{Duration, Instant};

    /// Get the running coroutine's ID
    ///
    /// Returns `CoroutineId::NONE` if not running in a coroutine.
    #[inline]
    pub fn id() -> CoroutineId {
        cothread_runtime::current_id()
    }

    /// Suspend and return control to the `join()` that resumed us
    #[inline]
    pub fn yield_now() {
        cothread_runtime::yield_now()
    }

    /// Suspend until at least `duration` has passed
    pub fn sleep_for(duration: Duration) {
        cothread_runtime::sleep_for(duration)
    }

    /// Suspend until `deadline`
    pub fn sleep_until(deadline: Instant) {
        cothread_runtime::sleep_until(deadline)
    }

    #[inline]
    pub fn sleep_ms(ms: u64) {
        cothread_runtime::sleep_ms(ms)
    }

    #[inline]
    pub fn sleep_us(us: u64) {
        cothread_runtime::sleep_us(us)
    }

    /// Check if currently executing within a coroutine
    #[inline]
    pub fn is_in_coroutine() -> bool {
        cothread_runtime::is_in_coroutine()
    }

    /// Name of the running coroutine, if its `Builder` gave one
    pub fn name() -> Option<String> {
        cothread_runtime::current_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[test]
    fn test_this_coroutine_outside() {
        assert_eq!(this_coroutine::id(), CoroutineId::NONE);
        assert!(!this_coroutine::is_in_coroutine());
        assert_eq!(this_coroutine::name(), None);
        this_coroutine::yield_now();
        this_coroutine::sleep_ms(1_000);
    }

    #[test]
    fn test_spawn_and_join_to_completion() {
        let x = Arc::new(AtomicUsize::new(0));
        let x2 = Arc::clone(&x);
        let mut co = spawn(move || {
            x2.store(1, Ordering::SeqCst);
            this_coroutine::yield_now();
            x2.store(2, Ordering::SeqCst);
        });

        co.join();
        assert_eq!(x.load(Ordering::SeqCst), 1);
        co.join();
        assert_eq!(x.load(Ordering::SeqCst), 2);
        assert!(!co.joinable());
    }

    #[test]
    fn test_ids_are_distinct_and_visible_inside() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut cos: Vec<Coroutine> = (0..4)
            .map(|_| {
                let seen = Arc::clone(&seen);
                spawn(move || {
                    assert!(this_coroutine::is_in_coroutine());
                    seen.lock().unwrap().push(this_coroutine::id());
                })
            })
            .collect();
        let ids: Vec<CoroutineId> = cos.iter().map(Coroutine::id).collect();

        for co in cos.iter_mut() {
            co.join();
        }
        assert_eq!(*seen.lock().unwrap(), ids);
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_yield_from_nested_calls() {
        fn walk(depth: u32, log: &Mutex<Vec<u32>>) {
            log.lock().unwrap().push(depth);
            this_coroutine::yield_now();
            if depth > 0 {
                walk(depth - 1, log);
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        let mut co = spawn(move || walk(3, &l));

        let mut joins = 0;
        while co.joinable() {
            co.join();
            joins += 1;
        }
        assert_eq!(joins, 5);
        assert_eq!(*log.lock().unwrap(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_named_builder() {
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        let mut co = Builder::new()
            .name("reader")
            .spawn(move || *s.lock().unwrap() = this_coroutine::name())
            .unwrap();
        co.join();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("reader"));
    }

    #[test]
    fn test_panic_reaches_joiner() {
        let mut co = spawn(|| panic!("bad input {}", 7));
        let err = panic::catch_unwind(AssertUnwindSafe(|| co.join())).unwrap_err();
        assert_eq!(err.downcast_ref::<String>().map(String::as_str), Some("bad input 7"));
        co.join();
        assert_eq!(co.state(), CoroutineState::Completed);
    }

    #[test]
    fn test_sleep_until_respects_deadline() {
        let deadline = Instant::now() + Duration::from_millis(50);
        let mut co = spawn(move || this_coroutine::sleep_until(deadline));

        co.join();
        assert_eq!(co.deadline(), Some(deadline));
        while co.joinable() {
            if let Some(d) = co.deadline() {
                std::thread::sleep(d.saturating_duration_since(Instant::now()));
            }
            co.join();
        }
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn test_take_moves_ownership() {
        let mut a = spawn(|| this_coroutine::yield_now());
        a.join();
        let id = a.id();

        let mut b = std::mem::take(&mut a);
        assert_eq!(a.id(), CoroutineId::NONE);
        assert!(!a.joinable());
        assert_eq!(b.id(), id);
        assert_eq!(b.state(), CoroutineState::Suspended);
        b.join();
        assert!(!b.joinable());
    }
}
