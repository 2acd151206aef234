//! # cothread-core
//!
//! Core types for the cothread stackful coroutine engine.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Stacks, register switching and the per-thread registry live in
//! `cothread-runtime`.
//!
//! ## Modules
//!
//! - `id` - Coroutine identifier type
//! - `state` - Coroutine lifecycle state
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::CoroutineId;
pub use state::CoroutineState;
pub use error::{CoroError, CoroResult, MemoryError};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_size};

/// Constants for stack layout
pub mod constants {
    /// Default usable stack size per coroutine.
    ///
    /// Physical pages are only committed when touched, so the default errs
    /// on the generous side of typical call depths.
    #[cfg(feature = "large-stack")]
    pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;  // 1 MB

    #[cfg(not(feature = "large-stack"))]
    pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;  // 64 KB

    /// Smallest usable stack we hand out (trampoline frame + panic machinery)
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Stack pointer alignment required at call boundaries (SysV and AAPCS64)
    pub const STACK_ALIGNMENT: usize = 16;

    /// Page size assumed when the OS cannot be asked
    pub const FALLBACK_PAGE_SIZE: usize = 4096;

    /// Raw value of the "no coroutine" id
    pub const COROUTINE_NONE: u64 = 0;
}
