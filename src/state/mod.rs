//! State module for tracking fetch progress
//!
//! This module provides the state machine that every book and catalog page
//! fetch moves through, and the classification of why a book was skipped.
//!
//! # Components
//!
//! - `FetchState`: Tracks one fetch attempt loop (fetching, retrying, terminal)
//! - `SkipReason`: Why a book or page was left out of the results

mod fetch_state;
mod skip_reason;

// Re-export main types
pub use fetch_state::FetchState;
pub use skip_reason::SkipReason;
