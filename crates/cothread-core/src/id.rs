//! Coroutine identifier type

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::constants::COROUTINE_NONE;

/// Next id to hand out. Starts past the NONE sentinel.
static NEXT_ID: AtomicU64 = AtomicU64::new(COROUTINE_NONE + 1);

/// Unique identifier for one coroutine execution
///
/// Ids come from a process-wide counter and are never reused, so two ids
/// compare equal only if they name the same coroutine. The value 0 is
/// reserved as the "no coroutine" sentinel and is also the default.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CoroutineId(u64);

impl CoroutineId {
    /// Sentinel value indicating no coroutine
    pub const NONE: CoroutineId = CoroutineId(COROUTINE_NONE);

    /// Allocate a fresh, never before seen id
    #[inline]
    pub fn next() -> Self {
        // Relaxed is enough: uniqueness only needs the RMW to be atomic.
        let raw = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        assert!(raw != COROUTINE_NONE, "coroutine id counter wrapped");
        CoroutineId(raw)
    }

    /// Get the raw u64 value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == COROUTINE_NONE
    }

    /// Check if this names a coroutine
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != COROUTINE_NONE
    }

    /// Convert to Option
    #[inline]
    pub const fn to_option(self) -> Option<CoroutineId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<CoroutineId> for u64 {
    #[inline]
    fn from(id: CoroutineId) -> Self {
        id.0
    }
}

impl fmt::Debug for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "CoroutineId(NONE)")
        } else {
            write!(f, "CoroutineId({})", self.0)
        }
    }
}

impl fmt::Display for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for CoroutineId {
    fn default() -> Self {
        CoroutineId::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_coroutine_id_basics() {
        let id = CoroutineId::next();
        assert!(id.is_some());
        assert!(!id.is_none());
        assert_eq!(id.to_option(), Some(id));
        assert_ne!(id.as_u64(), COROUTINE_NONE);
    }

    #[test]
    fn test_coroutine_id_none() {
        let none = CoroutineId::NONE;
        assert!(none.is_none());
        assert!(!none.is_some());
        assert_eq!(none.to_option(), None);
        assert_eq!(CoroutineId::default(), none);
    }

    #[test]
    fn test_coroutine_id_unique() {
        let ids: HashSet<CoroutineId> = (0..1000).map(|_| CoroutineId::next()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(!ids.contains(&CoroutineId::NONE));
    }

    #[test]
    fn test_coroutine_id_ordering() {
        let a = CoroutineId::next();
        let b = CoroutineId::next();
        assert!(a < b);
    }

    #[test]
    fn test_coroutine_id_format() {
        assert_eq!(format!("{}", CoroutineId::NONE), "none");
        assert_eq!(format!("{:?}", CoroutineId::NONE), "CoroutineId(NONE)");
        let id = CoroutineId::next();
        assert_eq!(format!("{}", id), id.as_u64().to_string());
    }
}
