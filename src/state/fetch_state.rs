/// Fetch state definitions for the per-book and per-page retry loop
///
/// Every fetch of a book or catalog page moves through these states:
/// `Fetching -> {Success, PermanentSkip, RetryableFailure, Cancelled}`, with
/// `RetryableFailure` looping back to `Fetching` after the backoff delay.
use std::fmt;

/// Represents the current state of one fetch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    // ===== Active States =====
    /// A request (and its parsing/downloads) is in flight
    Fetching,

    /// A connection-level failure occurred; waiting out the backoff
    RetryableFailure,

    // ===== Terminal States =====
    /// The operation produced its result
    Success,

    /// The operation failed in a way retrying cannot fix
    PermanentSkip,

    /// An external cancellation signal ended the operation
    Cancelled,
}

impl FetchState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::PermanentSkip | Self::Cancelled)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: FetchState) -> bool {
        match self {
            Self::Fetching => matches!(
                next,
                Self::Success | Self::PermanentSkip | Self::RetryableFailure | Self::Cancelled
            ),
            Self::RetryableFailure => matches!(
                next,
                Self::Fetching | Self::PermanentSkip | Self::Cancelled
            ),
            Self::Success | Self::PermanentSkip | Self::Cancelled => false,
        }
    }

    /// Stable lowercase name used in log events
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::RetryableFailure => "retryable_failure",
            Self::Success => "success",
            Self::PermanentSkip => "permanent_skip",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns all possible fetch states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Fetching,
            Self::RetryableFailure,
            Self::Success,
            Self::PermanentSkip,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
