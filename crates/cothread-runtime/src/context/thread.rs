//! Thread-backed context
//!
//! Each coroutine body runs on its own OS thread, but only while holding
//! the single baton passed through [`HandOff`] signals, so exactly one
//! side runs at any instant, as with register switching.

use super::{EntryFn, ExecutionContext};
use crate::stack::Stack;
use cothread_core::constants::MIN_STACK_SIZE;
use cothread_core::error::{CoroError, CoroResult};
use cothread_core::kerror;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    /// Nothing to consume
    Idle,
    /// One wake-up pending
    Pending,
    /// Owner is gone; waiters return false
    Closed,
}

/// Single-slot wake-up signal
///
/// A `notify` before the matching `wait` is remembered, so wake-ups are
/// never lost. Notifications do not accumulate beyond one.
#[derive(Debug)]
pub struct HandOff {
    slot: Mutex<Signal>,
    cond: Condvar,
}

impl HandOff {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Signal::Idle),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Signal> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post the wake-up
    pub fn notify(&self) {
        let mut slot = self.lock();
        if *slot != Signal::Closed {
            *slot = Signal::Pending;
        }
        drop(slot);
        self.cond.notify_one();
    }

    /// Block until notified (true) or closed (false)
    pub fn wait(&self) -> bool {
        let mut slot = self.lock();
        loop {
            match *slot {
                Signal::Pending => {
                    *slot = Signal::Idle;
                    return true;
                }
                Signal::Closed => return false,
                Signal::Idle => {
                    slot = self.cond.wait(slot).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Release every current and future waiter
    pub fn close(&self) {
        *self.lock() = Signal::Closed;
        self.cond.notify_all();
    }
}

impl Default for HandOff {
    fn default() -> Self {
        Self::new()
    }
}

/// Context backed by a parked OS thread
#[derive(Debug, Default)]
pub struct ThreadContext {
    /// Signalled to resume whoever is saved in this context
    signal: Arc<HandOff>,

    /// Worker running the coroutine body (initial contexts only)
    worker: Option<JoinHandle<()>>,
}

impl ExecutionContext for ThreadContext {
    const RUNS_ON_STACK: bool = false;

    unsafe fn make_initial(stack: &Stack, entry: EntryFn, arg: usize) -> CoroResult<Self> {
        let signal = Arc::new(HandOff::new());
        let start = Arc::clone(&signal);

        let worker = thread::Builder::new()
            .name("cothread".into())
            .stack_size(stack.usable_size().max(MIN_STACK_SIZE))
            .spawn(move || {
                // Closed before the first swap in: the body never runs
                if start.wait() {
                    entry(arg);
                }
            })
            .map_err(|e| {
                kerror!("failed to spawn context thread: {}", e);
                CoroError::ContextSpawnFailed
            })?;

        Ok(Self {
            signal,
            worker: Some(worker),
        })
    }

    unsafe fn swap(current: *mut Self, target: *const Self) {
        // Own both signals before waking the other side: once it runs it
        // may free the memory behind `current` and `target`.
        let resume_me = Arc::clone(&(*current).signal);
        let wake = Arc::clone(&(*target).signal);
        wake.notify();
        resume_me.wait();
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        self.signal.close();
        if let Some(worker) = self.worker.take() {
            // The worker is parked at its start or final swap; closing
            // the signal lets it return.
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::UnsafeCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_handoff_remembers_early_notify() {
        let h = HandOff::new();
        h.notify();
        h.notify(); // does not accumulate
        assert!(h.wait());
        h.close();
        assert!(!h.wait());
    }

    #[test]
    fn test_handoff_wakes_waiter() {
        let h = Arc::new(HandOff::new());
        let h2 = Arc::clone(&h);
        let waiter = thread::spawn(move || h2.wait());
        thread::sleep(Duration::from_millis(20));
        h.notify();
        assert!(waiter.join().unwrap());
    }

    struct PingPong {
        main: UnsafeCell<ThreadContext>,
        side: UnsafeCell<ThreadContext>,
        hits: AtomicUsize,
    }

    // Accessed from both threads, one at a time under the hand-off baton
    unsafe impl Sync for PingPong {}

    extern "C" fn side_entry(arg: usize) {
        let pp = unsafe { &*(arg as *const PingPong) };
        for _ in 0..3 {
            pp.hits.fetch_add(1, Ordering::SeqCst);
            unsafe { ThreadContext::swap(pp.side.get(), pp.main.get()) };
        }
    }

    #[test]
    fn test_swap_round_trips() {
        let stack = Stack::default();
        let pp = Box::new(PingPong {
            main: UnsafeCell::new(ThreadContext::default()),
            side: UnsafeCell::new(ThreadContext::default()),
            hits: AtomicUsize::new(0),
        });
        let arg = &*pp as *const PingPong as usize;
        unsafe {
            *pp.side.get() = ThreadContext::make_initial(&stack, side_entry, arg).unwrap();
        }

        for expected in 1..=3 {
            unsafe { ThreadContext::swap(pp.main.get(), pp.side.get()) };
            assert_eq!(pp.hits.load(Ordering::SeqCst), expected);
        }
        // Dropping closes the side's signal; its final swap returns and
        // the worker is joined.
        drop(pp);
    }
}
