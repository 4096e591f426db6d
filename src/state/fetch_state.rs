/// Fetch state definitions for a single logical retrieval
///
/// This module defines the states one `FetchClient` call moves through while it retries a URL.
use crate::fetch::FetchError;
use std::fmt;

/// Represents the current state of one logical fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    // ===== Active States =====
    /// No attempt has been made yet
    Idle,

    /// A request is in flight
    Attempting,

    /// The last response was classified as a block (status, keyword or short body)
    Blocked,

    /// The last attempt failed with a timeout, connection error or unexpected status
    TransientError,

    /// Waiting out the backoff delay before the next attempt
    Backoff,

    // ===== Terminal States =====
    /// A usable response was received
    Success,

    /// The server reported the page as gone (404/410)
    NotFound,

    /// Every allowed attempt failed
    Exhausted,
}

impl FetchState {
    /// Returns true if this is a terminal state (the fetch call is over)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::NotFound | Self::Exhausted)
    }

    /// Returns true if the state represents a failed attempt that may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Blocked | Self::TransientError)
    }

    /// Checks whether moving from this state to `next` is a legal transition
    ///
    /// The legal graph is:
    /// `Idle -> Attempting -> {Success | NotFound | Blocked | TransientError}`,
    /// `{Blocked | TransientError} -> {Backoff | Exhausted}` and `Backoff -> Attempting`.
    pub fn can_transition_to(&self, next: FetchState) -> bool {
        use FetchState::*;

        matches!(
            (self, next),
            (Idle, Attempting)
                | (Attempting, Success)
                | (Attempting, NotFound)
                | (Attempting, Blocked)
                | (Attempting, TransientError)
                | (Blocked, Backoff)
                | (Blocked, Exhausted)
                | (TransientError, Backoff)
                | (TransientError, Exhausted)
                | (Backoff, Attempting)
        )
    }

    /// Validates and performs a transition
    ///
    /// # Returns
    ///
    /// * `Ok(next)` - If the transition is legal
    /// * `Err(FetchError::InvalidTransition)` - If it is not
    pub fn transition(self, next: FetchState) -> Result<FetchState, FetchError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(FetchError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }

    /// Returns a short, stable name for the state
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Attempting => "attempting",
            Self::Blocked => "blocked",
            Self::TransientError => "transient_error",
            Self::Backoff => "backoff",
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(FetchState::Success.is_terminal());
        assert!(FetchState::NotFound.is_terminal());
        assert!(FetchState::Exhausted.is_terminal());

        assert!(!FetchState::Idle.is_terminal());
        assert!(!FetchState::Attempting.is_terminal());
        assert!(!FetchState::Blocked.is_terminal());
        assert!(!FetchState::Backoff.is_terminal());
    }

    #[test]
    fn test_retry_cycle_is_legal() {
        let state = FetchState::Idle
            .transition(FetchState::Attempting)
            .and_then(|s| s.transition(FetchState::Blocked))
            .and_then(|s| s.transition(FetchState::Backoff))
            .and_then(|s| s.transition(FetchState::Attempting))
            .and_then(|s| s.transition(FetchState::TransientError))
            .and_then(|s| s.transition(FetchState::Exhausted))
            .unwrap();

        assert_eq!(state, FetchState::Exhausted);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        assert!(FetchState::Idle.transition(FetchState::Success).is_err());
        assert!(FetchState::Success
            .transition(FetchState::Attempting)
            .is_err());
        assert!(FetchState::Backoff.transition(FetchState::Exhausted).is_err());

        match FetchState::Exhausted.transition(FetchState::Attempting) {
            Err(FetchError::InvalidTransition { from, to }) => {
                assert_eq!(from, "exhausted");
                assert_eq!(to, "attempting");
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_retryable_states() {
        assert!(FetchState::Blocked.is_retryable());
        assert!(FetchState::TransientError.is_retryable());
        assert!(!FetchState::NotFound.is_retryable());
        assert!(!FetchState::Success.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FetchState::TransientError), "transient_error");
        assert_eq!(format!("{}", FetchState::NotFound), "not_found");
    }
}
