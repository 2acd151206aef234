//! # cothread-runtime
//!
//! Platform-specific implementation of the cothread coroutine engine.
//!
//! This crate provides:
//! - Stack allocation (mmap + guard page on unix, `std::alloc` elsewhere)
//! - Context switching (architecture-specific assembly, or a thread
//!   hand-off fallback)
//! - The per-thread registry of the running coroutine
//! - The `Coroutine` handle, its trampoline and cooperative sleep

pub mod config;
pub mod stack;
pub mod context;
pub mod tls;
pub mod coroutine;
pub mod timer;

#[cfg(all(unix, any(target_arch = "x86_64", target_arch = "aarch64")))]
pub mod arch;

// Re-exports
pub use config::CoroutineConfig;
pub use context::{ExecutionContext, PlatformContext};
pub use coroutine::{yield_now, Builder, Coroutine};
pub use stack::Stack;
pub use timer::{sleep_for, sleep_ms, sleep_until, sleep_us};
pub use tls::{current_id, current_name, is_in_coroutine};

/// True when coroutines switch registers on the calling thread rather
/// than running on parked worker threads
pub const MACHINE_CONTEXT: bool = cfg!(all(
    unix,
    any(target_arch = "x86_64", target_arch = "aarch64"),
    not(feature = "thread-context"),
));
