//! Architecture-specific context switching
//!
//! Provides assembly implementations for saving and restoring the
//! callee-saved register set when switching between a coroutine stack and
//! its caller.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
        pub use self::x86_64::*;
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
        pub use self::aarch64::*;
    }
}
