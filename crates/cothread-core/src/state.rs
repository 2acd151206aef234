//! Coroutine lifecycle state

use core::fmt;

/// State of a coroutine handle
///
/// Transitions only move forward:
///
/// ```text
/// Created ──▶ Running ◀──▶ Suspended
///                │
///                ▼
///            Completed
/// ```
///
/// `Empty` never transitions; it only becomes `Created` by binding a new
/// function, which is a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoroutineState {
    /// No function bound (default-constructed or moved-from)
    Empty = 0,

    /// Function bound, never entered
    Created = 1,

    /// Paused at a yield or an unmet sleep deadline
    Suspended = 2,

    /// Currently executing its body
    Running = 3,

    /// Body returned (or panicked); terminal
    Completed = 4,
}

impl CoroutineState {
    /// Check if `join()` has work to do
    #[inline]
    pub const fn is_joinable(&self) -> bool {
        matches!(self, CoroutineState::Created | CoroutineState::Suspended)
    }

    /// Check if this coroutine can never run again
    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, CoroutineState::Empty | CoroutineState::Completed)
    }

    /// Check whether moving to `next` respects the lifecycle order
    pub const fn can_transition_to(&self, next: CoroutineState) -> bool {
        use CoroutineState::*;
        matches!(
            (*self, next),
            (Created, Running)
                | (Suspended, Running)
                | (Running, Suspended)
                | (Running, Completed)
        )
    }
}

impl Default for CoroutineState {
    fn default() -> Self {
        CoroutineState::Empty
    }
}

impl From<u8> for CoroutineState {
    fn from(v: u8) -> Self {
        match v {
            0 => CoroutineState::Empty,
            1 => CoroutineState::Created,
            2 => CoroutineState::Suspended,
            3 => CoroutineState::Running,
            4 => CoroutineState::Completed,
            _ => CoroutineState::Empty, // Default for invalid values
        }
    }
}

impl From<CoroutineState> for u8 {
    fn from(state: CoroutineState) -> u8 {
        state as u8
    }
}

impl fmt::Display for CoroutineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoroutineState::Empty => write!(f, "empty"),
            CoroutineState::Created => write!(f, "created"),
            CoroutineState::Suspended => write!(f, "suspended"),
            CoroutineState::Running => write!(f, "running"),
            CoroutineState::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CoroutineState::*;

    #[test]
    fn test_joinable() {
        assert!(Created.is_joinable());
        assert!(Suspended.is_joinable());
        assert!(!Empty.is_joinable());
        assert!(!Running.is_joinable());
        assert!(!Completed.is_joinable());
    }

    #[test]
    fn test_terminated() {
        assert!(Empty.is_terminated());
        assert!(Completed.is_terminated());
        assert!(!Created.is_terminated());
        assert!(!Suspended.is_terminated());
        assert!(!Running.is_terminated());
    }

    #[test]
    fn test_transitions_forward_only() {
        assert!(Created.can_transition_to(Running));
        assert!(Running.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Suspended));
        assert!(!Suspended.can_transition_to(Created));
        assert!(!Created.can_transition_to(Completed));
        assert!(!Empty.can_transition_to(Running));
    }

    #[test]
    fn test_u8_roundtrip_and_invalid() {
        for s in [Empty, Created, Suspended, Running, Completed] {
            assert_eq!(CoroutineState::from(u8::from(s)), s);
        }
        assert_eq!(CoroutineState::from(200), Empty);
    }

    #[test]
    fn test_display() {
        assert_eq!(Suspended.to_string(), "suspended");
        assert_eq!(CoroutineState::default().to_string(), "empty");
    }
}
