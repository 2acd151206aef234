//! Execution contexts
//!
//! An [`ExecutionContext`] is one saved point of execution. Entering a
//! coroutine and yielding out of one are the same operation, [`swap`],
//! used from opposite sides.
//!
//! Two implementations exist:
//! - [`MachineContext`]: saves and restores the callee-saved registers on
//!   the calling OS thread (unix x86_64/aarch64).
//! - [`ThreadContext`]: parks a dedicated OS thread per coroutine on a
//!   single-slot hand-off signal. Portable, and observably identical.
//!
//! [`PlatformContext`] names the one coroutines use. Enabling the
//! `thread-context` feature forces the thread implementation everywhere.
//!
//! [`swap`]: ExecutionContext::swap

mod thread;
pub use thread::{HandOff, ThreadContext};

use crate::stack::Stack;
use cothread_core::error::CoroResult;

cfg_if::cfg_if! {
    if #[cfg(all(unix, any(target_arch = "x86_64", target_arch = "aarch64")))] {
        mod machine;
        pub use machine::MachineContext;
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(
        unix,
        any(target_arch = "x86_64", target_arch = "aarch64"),
        not(feature = "thread-context"),
    ))] {
        /// Context implementation used by coroutines on this target
        pub type PlatformContext = MachineContext;
    } else {
        /// Context implementation used by coroutines on this target
        pub type PlatformContext = ThreadContext;
    }
}

/// Function first run inside a fresh context, with its argument
pub type EntryFn = extern "C" fn(usize);

/// A saved point of execution that can be switched to
///
/// `Default` produces an unfilled context; it becomes meaningful once a
/// `swap` saves into it.
pub trait ExecutionContext: Default {
    /// Whether the body executes on the `Stack` given to `make_initial`
    ///
    /// When false only the stack's size is used, so callers can pass
    /// `Stack::unmapped` instead of reserving memory.
    const RUNS_ON_STACK: bool;

    /// Build a context whose first `swap` in runs `entry(arg)` on `stack`
    ///
    /// # Safety
    ///
    /// `stack` must outlive the context. `entry` must never return while
    /// running on a machine context; it leaves by swapping away for good.
    unsafe fn make_initial(stack: &Stack, entry: EntryFn, arg: usize) -> CoroResult<Self>;

    /// Save the caller into `current`, then resume `target`
    ///
    /// Returns only when a later `swap` targets `current`.
    ///
    /// # Safety
    ///
    /// Both pointers must be valid; `target` must hold a live context and
    /// no other flow may be executing it.
    unsafe fn swap(current: *mut Self, target: *const Self);
}
