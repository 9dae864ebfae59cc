//! Per-run statistics
//!
//! The coordinator counts what happened to every book of a batch; the CLI
//! prints the result once the record set has been written.

use crate::state::SkipReason;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Counters for one run of the coordinator
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Book URLs handed to the coordinator
    pub books_requested: u64,

    /// Books that produced a record
    pub books_collected: u64,

    /// Books left out, by reason
    pub books_skipped: BTreeMap<SkipReason, u64>,

    /// Collected books without a downloadable text
    pub texts_missing: u64,

    /// Connection failures that were retried
    pub retries: u64,

    /// Books interrupted by cancellation
    pub books_cancelled: u64,

    /// Books never started because the run was cancelled
    pub books_not_started: u64,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            books_requested: 0,
            books_collected: 0,
            books_skipped: BTreeMap::new(),
            texts_missing: 0,
            retries: 0,
            books_cancelled: 0,
            books_not_started: 0,
        }
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.books_skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn total_skipped(&self) -> u64 {
        self.books_skipped.values().sum()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, if the run has finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of requested books that produced a record, in percent
    pub fn success_rate(&self) -> f64 {
        if self.books_requested == 0 {
            return 0.0;
        }
        (self.books_collected as f64 / self.books_requested as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Started: {}", stats.started_at.to_rfc3339());
    if let Some(seconds) = stats.duration_seconds() {
        println!("Duration: {}s", seconds);
    }
    println!();

    println!("Books:");
    println!("  Requested: {}", stats.books_requested);
    println!("  Collected: {}", stats.books_collected);
    println!("  Without text: {}", stats.texts_missing);
    println!("  Skipped: {}", stats.total_skipped());
    for (reason, count) in &stats.books_skipped {
        println!("    {}: {}", reason, count);
    }
    if stats.books_cancelled > 0 || stats.books_not_started > 0 {
        println!("  Cancelled: {}", stats.books_cancelled);
        println!("  Not started: {}", stats.books_not_started);
    }
    println!("  Connection retries: {}", stats.retries);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} books collected)",
        stats.success_rate(),
        stats.books_collected,
        stats.books_requested
    );
}
