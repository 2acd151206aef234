//! Error types for the coroutine engine

use core::fmt;

/// Result type for coroutine operations
pub type CoroResult<T> = Result<T, CoroError>;

/// Errors that can occur while setting up a coroutine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoroError {
    /// Stack memory could not be reserved or protected
    MemoryError(MemoryError),

    /// Configuration rejected by `validate()`
    InvalidConfig(&'static str),

    /// The OS thread backing a thread-based context could not be spawned
    ContextSpawnFailed,
}

impl fmt::Display for CoroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoroError::MemoryError(e) => write!(f, "memory error: {}", e),
            CoroError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            CoroError::ContextSpawnFailed => write!(f, "failed to spawn context thread"),
        }
    }
}

impl std::error::Error for CoroError {}

/// Stack memory errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap or the global allocator failed
    AllocationFailed,

    /// mprotect on the usable part of the stack failed
    ProtectionFailed,

    /// Requested size overflows once rounded up to pages
    SizeOverflow,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "stack allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "stack protection change failed"),
            MemoryError::SizeOverflow => write!(f, "stack size overflow"),
        }
    }
}

impl From<MemoryError> for CoroError {
    fn from(e: MemoryError) -> Self {
        CoroError::MemoryError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = CoroError::ContextSpawnFailed;
        assert_eq!(format!("{}", e), "failed to spawn context thread");

        let e = CoroError::MemoryError(MemoryError::AllocationFailed);
        assert_eq!(format!("{}", e), "memory error: stack allocation failed");

        let e = CoroError::InvalidConfig("stack_size below minimum");
        assert_eq!(format!("{}", e), "invalid config: stack_size below minimum");
    }

    #[test]
    fn test_every_variant_displays() {
        let all = [
            CoroError::MemoryError(MemoryError::AllocationFailed),
            CoroError::MemoryError(MemoryError::ProtectionFailed),
            CoroError::MemoryError(MemoryError::SizeOverflow),
            CoroError::InvalidConfig("x"),
            CoroError::ContextSpawnFailed,
        ];
        for e in all {
            // Exhaustive: a new variant must get a Display arm and a place here
            match &e {
                CoroError::MemoryError(_) | CoroError::InvalidConfig(_) | CoroError::ContextSpawnFailed => {}
            }
            assert!(!e.to_string().is_empty());
        }
    }

    #[test]
    fn test_error_conversion() {
        fn reserve() -> CoroResult<()> {
            Err(MemoryError::SizeOverflow)?
        }
        assert!(matches!(reserve(), Err(CoroError::MemoryError(MemoryError::SizeOverflow))));
    }
}
