//! Cooperative sleep
//!
//! A sleeping coroutine records its deadline and yields until a `join()`
//! finds the deadline reached. Nothing runs in the background: the
//! owner decides when to join, and can read `Coroutine::deadline()` to
//! avoid joining early.

use crate::coroutine::yield_now;
use crate::tls;
use std::time::{Duration, Instant};

/// Suspend the running coroutine until `deadline`
///
/// Each `join()` before the deadline resumes the body just long enough to
/// see it is still early and suspend again. A join at or after the
/// deadline continues straight past this call. Outside a coroutine this
/// returns immediately.
pub fn sleep_until(deadline: Instant) {
    let current = tls::current();
    if current.is_null() {
        return;
    }
    // SAFETY: a registered block outlives its registration
    let inner = unsafe { &*current };

    inner.set_deadline(Some(deadline));
    while Instant::now() < deadline {
        yield_now();
    }
    inner.set_deadline(None);
}

/// Suspend the running coroutine for at least `duration`
///
/// A duration too large to represent as an `Instant` never elapses: every
/// later `join()` suspends again.
pub fn sleep_for(duration: Duration) {
    if !tls::is_in_coroutine() {
        return;
    }
    match Instant::now().checked_add(duration) {
        Some(deadline) => sleep_until(deadline),
        None => loop {
            yield_now();
        },
    }
}

#[inline]
pub fn sleep_ms(ms: u64) {
    sleep_for(Duration::from_millis(ms));
}

#[inline]
pub fn sleep_us(us: u64) {
    sleep_for(Duration::from_micros(us));
}
