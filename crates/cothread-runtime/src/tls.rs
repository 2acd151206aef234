//! Thread-local registry of the running coroutine
//!
//! One slot per OS thread. `join()` saves the previous value, installs its
//! coroutine and restores the previous value once control comes back, so
//! a coroutine may drive other coroutines on the same thread.

use crate::coroutine::CoroutineInner;
use cothread_core::id::CoroutineId;
use cothread_core::kprint;
use std::cell::Cell;
use std::ptr;

thread_local! {
    /// Coroutine whose body is executing on this OS thread
    static CURRENT: Cell<*const CoroutineInner> = const { Cell::new(ptr::null()) };
}

/// Install `inner` as this thread's current coroutine, returning the
/// previous entry for `leave`
#[inline]
pub(crate) fn enter(inner: *const CoroutineInner) -> *const CoroutineInner {
    let previous = CURRENT.with(|cell| cell.replace(inner));
    kprint::set_context_id(raw_id(inner));
    previous
}

/// Restore the entry returned by the matching `enter`
#[inline]
pub(crate) fn leave(previous: *const CoroutineInner) {
    CURRENT.with(|cell| cell.set(previous));
    kprint::set_context_id(raw_id(previous));
}

/// Current coroutine block, or null outside any coroutine
#[inline]
pub(crate) fn current() -> *const CoroutineInner {
    CURRENT.with(|cell| cell.get())
}

fn raw_id(inner: *const CoroutineInner) -> u64 {
    if inner.is_null() {
        return 0;
    }
    // SAFETY: registered blocks outlive their registration
    unsafe { (*inner).id().as_u64() }
}

/// Get the running coroutine's ID
///
/// Returns `CoroutineId::NONE` when no coroutine runs on this thread.
#[inline]
pub fn current_id() -> CoroutineId {
    let inner = current();
    if inner.is_null() {
        CoroutineId::NONE
    } else {
        // SAFETY: registered blocks outlive their registration
        unsafe { (*inner).id() }
    }
}

/// Check if we're running inside a coroutine body
#[inline]
pub fn is_in_coroutine() -> bool {
    !current().is_null()
}

/// Name given to the running coroutine by its `Builder`
pub fn current_name() -> Option<String> {
    let inner = current();
    if inner.is_null() {
        None
    } else {
        // SAFETY: registered blocks outlive their registration
        unsafe { (*inner).name().map(str::to_owned) }
    }
}
