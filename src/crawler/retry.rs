//! Retry policy for book and catalog page fetches
//!
//! Each operation runs as an explicit state machine:
//!
//! ```text
//! Fetching --ok--------------------> Success
//!          --permanent error-------> PermanentSkip
//!          --cancel----------------> Cancelled
//!          --connection failure----> RetryableFailure --backoff--> Fetching
//!                                                     --cap------> PermanentSkip
//!                                                     --cancel---> Cancelled
//! ```
//!
//! Only connection-level failures are retried, and only the operation that
//! failed is retried. By default there is no attempt cap.

use crate::config::RetryConfig;
use crate::output::{CrawlEvent, EventSink};
use crate::state::FetchState;
use crate::HarvestError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backoff used when nothing else is configured
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(30);

/// How connection failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait between a connection failure and the next attempt
    pub backoff: Duration,

    /// Total attempts allowed; `None` retries until success or cancellation
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_BACKOFF)
    }
}

/// Result of running an operation under a [`RetryPolicy`]
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The operation's value, or the error that ended the loop
    pub result: Result<T, HarvestError>,

    /// Number of attempts started
    pub attempts: u32,

    /// Terminal state the loop ended in
    pub state: FetchState,
}

impl<T> RetryOutcome<T> {
    /// Connection failures that were retried
    pub fn retries(&self) -> u32 {
        if self.state.is_terminal() {
            self.attempts.saturating_sub(1)
        } else {
            self.attempts
        }
    }
}

impl RetryPolicy {
    /// Retries connection failures forever, waiting `backoff` between attempts
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }

    /// Gives up after `max_attempts` attempts (values below 1 count as 1)
    pub fn bounded(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let backoff = Duration::from_secs(config.backoff_secs);
        match config.max_attempts {
            0 => Self::unbounded(backoff),
            n => Self::bounded(backoff, n),
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, exhausts the
    /// attempt cap, or `cancel` fires
    ///
    /// `target` names the book or page in events and errors. Cancellation is
    /// observed while an attempt is in flight and during the backoff wait; an
    /// interrupted attempt is dropped.
    pub async fn run<T, F, Fut>(
        &self,
        target: &str,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
        mut operation: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        let mut state = FetchState::Fetching;
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                return cancelled(target, attempts, &mut state, sink);
            }

            attempts += 1;
            tracing::trace!(target_url = target, attempts, "attempt started");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return cancelled(target, attempts, &mut state, sink);
                }
                result = operation() => result,
            };

            let error = match result {
                Ok(value) => {
                    transition(&mut state, FetchState::Success);
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                        state,
                    };
                }
                Err(error) if error.is_cancelled() => {
                    return cancelled(target, attempts, &mut state, sink);
                }
                Err(error) if !error.is_retryable() => {
                    transition(&mut state, FetchState::PermanentSkip);
                    return RetryOutcome {
                        result: Err(error),
                        attempts,
                        state,
                    };
                }
                Err(error) => error,
            };

            transition(&mut state, FetchState::RetryableFailure);

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                transition(&mut state, FetchState::PermanentSkip);
                return RetryOutcome {
                    result: Err(HarvestError::RetriesExhausted {
                        target: target.to_string(),
                        attempts,
                        last_error: error.to_string(),
                    }),
                    attempts,
                    state,
                };
            }

            sink.record(CrawlEvent::RetryScheduled {
                target: target.to_string(),
                attempt: attempts,
                backoff: self.backoff,
                message: error.to_string(),
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return cancelled(target, attempts, &mut state, sink);
                }
                _ = tokio::time::sleep(self.backoff) => {}
            }

            transition(&mut state, FetchState::Fetching);
        }
    }
}

fn transition(state: &mut FetchState, next: FetchState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal fetch transition {} -> {}",
        state,
        next
    );
    *state = next;
}

fn cancelled<T>(
    target: &str,
    attempts: u32,
    state: &mut FetchState,
    sink: &dyn EventSink,
) -> RetryOutcome<T> {
    transition(state, FetchState::Cancelled);
    sink.record(CrawlEvent::Cancelled {
        target: target.to_string(),
    });
    RetryOutcome {
        result: Err(HarvestError::Cancelled {
            target: target.to_string(),
        }),
        attempts,
        state: *state,
    }
}
