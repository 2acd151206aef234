//! Coroutine configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder methods on `CoroutineConfig` / `Builder`
//! 2. Environment variables (runtime)
//! 3. User's cothread_config.rs (compile-time, via `COTHREAD_CONFIG_RS`)
//! 4. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use cothread_runtime::config::CoroutineConfig;
//!
//! let config = CoroutineConfig::from_env()
//!     .stack_size(256 * 1024)
//!     .guard_page(false);
//! ```

pub mod defaults;

use cothread_core::constants::MIN_STACK_SIZE;
use cothread_core::env::{env_get_bool, env_get_size};
use cothread_core::error::{CoroError, CoroResult};
use cothread_core::kwarn;
use std::sync::OnceLock;

/// Per-coroutine configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoroutineConfig {
    /// Usable stack bytes per coroutine (rounded up to whole pages)
    pub stack_size: usize,
    /// Keep an inaccessible page below the stack so overflow faults
    pub guard_page: bool,
    /// Log lifecycle events at info level instead of debug
    pub debug_logging: bool,
}

impl Default for CoroutineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl CoroutineConfig {
    /// Compile-time defaults only, ignoring the environment
    pub const fn compiled() -> Self {
        Self {
            stack_size: defaults::STACK_SIZE,
            guard_page: defaults::GUARD_PAGE,
            debug_logging: defaults::DEBUG_LOGGING,
        }
    }

    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `COTHREAD_STACK_SIZE` - Stack size per coroutine (`65536`, `256K`, `2M`)
    /// - `COTHREAD_GUARD_PAGE` - Guard page below each stack (0/1)
    /// - `COTHREAD_DEBUG` - Log lifecycle events at info level (0/1)
    pub fn from_env() -> Self {
        let compiled = Self::compiled();
        Self {
            stack_size: env_get_size("COTHREAD_STACK_SIZE", compiled.stack_size),
            guard_page: env_get_bool("COTHREAD_GUARD_PAGE", compiled.guard_page),
            debug_logging: env_get_bool("COTHREAD_DEBUG", compiled.debug_logging),
        }
    }

    /// Set the stack size
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Enable or disable the guard page
    pub fn guard_page(mut self, enable: bool) -> Self {
        self.guard_page = enable;
        self
    }

    /// Enable debug logging
    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> CoroResult<()> {
        if self.stack_size < MIN_STACK_SIZE {
            return Err(CoroError::InvalidConfig("stack_size below MIN_STACK_SIZE"));
        }
        if self.stack_size > isize::MAX as usize / 2 {
            return Err(CoroError::InvalidConfig("stack_size too large"));
        }
        Ok(())
    }
}

static GLOBAL: OnceLock<CoroutineConfig> = OnceLock::new();

/// Process-wide configuration, read from the environment once
///
/// `Builder::new()` starts from this value. An environment that fails
/// `validate()` is reported and replaced by the compiled defaults.
pub fn global() -> &'static CoroutineConfig {
    GLOBAL.get_or_init(|| {
        let config = CoroutineConfig::from_env();
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                kwarn!("ignoring environment configuration: {}", e);
                CoroutineConfig::compiled()
            }
        }
    })
}
