//! Event sink trait and event types
//!
//! Components never log skip and retry decisions directly. They report a
//! [`CrawlEvent`] to the [`EventSink`] they were constructed with, so the
//! decisions are observable in tests and routed to `tracing` in production.

use crate::state::SkipReason;
use crate::url::book_id;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Something worth reporting that happened during a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// A book record was assembled
    BookCollected { url: String, title: String },

    /// A book was permanently excluded from the results
    BookSkipped {
        url: String,
        reason: SkipReason,
        message: String,
    },

    /// The book has no downloadable text; it is kept with an empty text path
    TextMissing { url: String, title: String },

    /// A connection failure occurred and the operation will be retried
    RetryScheduled {
        target: String,
        attempt: u32,
        backoff: Duration,
        message: String,
    },

    /// A catalog page could not be read and was left out
    PageSkipped {
        url: String,
        reason: SkipReason,
        message: String,
    },

    /// The first catalog page could not be read, so no page count is known
    CatalogUnreachable {
        url: String,
        reason: SkipReason,
        message: String,
    },

    /// The requested start page lies beyond the last catalog page
    RangeOutOfBounds {
        start_page: u32,
        end_page: u32,
        total_pages: u32,
    },

    /// An external cancellation stopped work on `target`
    Cancelled { target: String },
}

/// Receives crawl events
///
/// Implementations must be thread-safe: books may be processed by several
/// tasks at once.
pub trait EventSink: Send + Sync {
    /// Records one event
    fn record(&self, event: CrawlEvent);
}

/// Forwards events to `tracing`
///
/// Skips, retries and cancellations are warnings; everything else is info.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::BookCollected { url, title } => {
                tracing::info!("Collected \"{}\" from {}", title, book_label(&url));
            }
            CrawlEvent::BookSkipped {
                url,
                reason,
                message,
            } => {
                tracing::warn!(%reason, "Skipping {}: {}", book_label(&url), message);
            }
            CrawlEvent::TextMissing { url, title } => {
                tracing::info!("{} (\"{}\") has no text on the site", book_label(&url), title);
            }
            CrawlEvent::RetryScheduled {
                target,
                attempt,
                backoff,
                message,
            } => {
                tracing::warn!(
                    attempt,
                    "Connection failure on {}: {}; retrying in {:?}",
                    target,
                    message,
                    backoff
                );
            }
            CrawlEvent::PageSkipped {
                url,
                reason,
                message,
            } => {
                tracing::warn!(%reason, "Skipping catalog page {}: {}", url, message);
            }
            CrawlEvent::CatalogUnreachable {
                url,
                reason,
                message,
            } => {
                tracing::warn!(%reason, "Catalog unreachable at {}: {}", url, message);
            }
            CrawlEvent::RangeOutOfBounds {
                start_page,
                end_page,
                total_pages,
            } => {
                tracing::warn!(
                    "Requested pages {}-{}, but the catalog has only {} pages",
                    start_page,
                    end_page,
                    total_pages
                );
            }
            CrawlEvent::Cancelled { target } => {
                tracing::warn!("Cancelled while working on {}", target);
            }
        }
    }
}

/// Names a book page by its id when the URL has one: `book 239 (https://...)`
fn book_label(url: &str) -> String {
    match Url::parse(url).ok().as_ref().and_then(book_id) {
        Some(id) => format!("book {} ({})", id, url),
        None => format!("book {}", url),
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events recorded so far
    pub fn events(&self) -> Vec<CrawlEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the recorded events matching `predicate`
    pub fn matching<F>(&self, predicate: F) -> Vec<CrawlEvent>
    where
        F: Fn(&CrawlEvent) -> bool,
    {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: CrawlEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
