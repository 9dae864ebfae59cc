//! Run coordinator - drives a batch of books through the pipeline
//!
//! This module contains the batch loop, which:
//! - Runs each book under the retry policy
//! - Keeps at most `concurrency` books in flight
//! - Merges records back into input order
//! - Reports skipped books without aborting the batch
//! - Stops starting new books once cancellation is requested

use crate::crawler::pipeline::{BookOutcome, BookPipeline, BookRecord, SkipOptions};
use crate::crawler::retry::{RetryOutcome, RetryPolicy};
use crate::output::{CrawlEvent, RunStatistics};
use crate::state::SkipReason;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main run coordinator structure
pub struct Coordinator {
    pipeline: Arc<BookPipeline>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    concurrency: usize,
    stats: RunStatistics,
}

impl Coordinator {
    /// Creates a coordinator that processes one book at a time
    pub fn new(pipeline: BookPipeline, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            policy,
            cancel,
            concurrency: 1,
            stats: RunStatistics::new(),
        }
    }

    /// Allows up to `concurrency` books in flight (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Statistics of the last run
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Processes `book_urls` and returns the collected records in input order
    ///
    /// A book that fails permanently is reported to the sink and left out;
    /// the rest of the batch continues. A book whose connection keeps failing
    /// is retried until it succeeds, hits the policy's attempt cap, or the run
    /// is cancelled. After cancellation no new book is started and the
    /// records collected so far are returned.
    pub async fn run(&mut self, book_urls: &[Url], options: SkipOptions) -> Vec<BookRecord> {
        self.stats = RunStatistics::new();
        self.stats.books_requested = book_urls.len() as u64;

        if options.skips_everything() {
            tracing::info!("Both texts and images are skipped; nothing to fetch");
            self.stats.finish();
            return Vec::new();
        }

        let mut records = BTreeMap::new();
        let mut tasks = JoinSet::new();
        let mut pending = book_urls.iter().cloned().enumerate();
        let mut started = 0u64;

        loop {
            while tasks.len() < self.concurrency && !self.cancel.is_cancelled() {
                let Some((index, url)) = pending.next() else {
                    break;
                };
                started += 1;

                let pipeline = Arc::clone(&self.pipeline);
                let policy = self.policy;
                let cancel = self.cancel.clone();
                tasks.spawn(async move {
                    let outcome = policy
                        .run(url.as_str(), &cancel, pipeline.sink(), || {
                            pipeline.process(&url, options)
                        })
                        .await;
                    (index, url, outcome)
                });
            }

            match tasks.join_next().await {
                Some(Ok((index, url, outcome))) => {
                    if let Some(record) = self.settle(&url, outcome, options) {
                        records.insert(index, record);
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("Book task failed: {}", e);
                }
                None => break,
            }
        }

        self.stats.books_not_started = self.stats.books_requested - started;
        self.stats.finish();

        tracing::info!(
            "Run finished: {} of {} books collected",
            records.len(),
            book_urls.len()
        );
        records.into_values().collect()
    }

    /// Turns one book's retry outcome into a record or a reported skip
    fn settle(
        &mut self,
        url: &Url,
        outcome: RetryOutcome<BookOutcome>,
        options: SkipOptions,
    ) -> Option<BookRecord> {
        self.stats.retries += u64::from(outcome.retries());
        let sink = self.pipeline.sink();

        match outcome.result {
            Ok(BookOutcome::Record(record)) => {
                self.stats.books_collected += 1;
                if !options.skip_text && record.text_asset_path.is_empty() {
                    self.stats.texts_missing += 1;
                }
                sink.record(CrawlEvent::BookCollected {
                    url: url.to_string(),
                    title: record.title.clone(),
                });
                Some(record)
            }
            Ok(BookOutcome::Skipped) => None,
            Err(e) if e.is_cancelled() => {
                self.stats.books_cancelled += 1;
                None
            }
            Err(e) => {
                let reason = SkipReason::from_error(&e);
                self.stats.record_skip(reason);
                sink.record(CrawlEvent::BookSkipped {
                    url: url.to_string(),
                    reason,
                    message: e.to_string(),
                });
                None
            }
        }
    }
}
