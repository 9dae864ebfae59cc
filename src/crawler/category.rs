//! Catalog traversal
//!
//! Collects the book URLs listed on a range of catalog pages. The last page
//! number is discovered from the first catalog page before the range is
//! walked, so requests past the end of the catalog are never made.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{extract_category_page, CategoryPageResult};
use crate::crawler::retry::{RetryOutcome, RetryPolicy};
use crate::output::{CrawlEvent, EventSink};
use crate::state::SkipReason;
use crate::url::category_page_url;
use crate::HarvestError;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A requested range of catalog pages, normalized so `start <= end`
///
/// Pages are numbered from 1; a start of 0 is read as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start: start.max(1),
            end: end.max(1),
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Clamps the range to a catalog of `total_pages` pages
    ///
    /// Returns `None` when the range starts past the last page.
    pub fn clamp_to(&self, total_pages: u32) -> Option<RangeInclusive<u32>> {
        if self.start > total_pages {
            None
        } else {
            Some(self.start..=self.end.min(total_pages))
        }
    }
}

/// Walks the pages of one catalog category
pub struct CategoryCrawler {
    fetcher: Fetcher,
    base_url: Url,
    category_id: u32,
    policy: RetryPolicy,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl CategoryCrawler {
    pub fn new(
        fetcher: Fetcher,
        base_url: Url,
        category_id: u32,
        policy: RetryPolicy,
        sink: Arc<dyn EventSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            category_id,
            policy,
            sink,
            cancel,
        }
    }

    /// Lists the absolute book URLs on catalog pages `start_page..=end_page`
    ///
    /// # Traversal
    ///
    /// 1. Normalize the range (swap if inverted)
    /// 2. Fetch page 1 to learn the total page count; if it cannot be read the
    ///    catalog is unreachable and the result is empty
    /// 3. A start page past the last page yields an empty result
    /// 4. Clamp the end page to the last page
    /// 5. Fetch each page in order and resolve its book links against the
    ///    page URL; pages that fail permanently are reported and skipped
    ///
    /// Connection failures are retried per page under the retry policy.
    /// Cancellation returns the URLs collected so far.
    pub async fn list_book_urls(&self, start_page: u32, end_page: u32) -> Vec<Url> {
        let range = PageRange::new(start_page, end_page);

        let first_page_url = match self.page_url(1) {
            Ok(url) => url,
            Err(e) => {
                self.sink.record(CrawlEvent::CatalogUnreachable {
                    url: self.base_url.to_string(),
                    reason: SkipReason::from_error(&e),
                    message: e.to_string(),
                });
                return Vec::new();
            }
        };

        let first_page = match self.fetch_category_page(&first_page_url).await.result {
            Ok(page) => page,
            Err(e) => {
                if !e.is_cancelled() {
                    self.sink.record(CrawlEvent::CatalogUnreachable {
                        url: first_page_url.to_string(),
                        reason: SkipReason::from_error(&e),
                        message: e.to_string(),
                    });
                }
                return Vec::new();
            }
        };

        let total_pages = first_page.total_page_count;
        let Some(pages) = range.clamp_to(total_pages) else {
            self.sink.record(CrawlEvent::RangeOutOfBounds {
                start_page: range.start(),
                end_page: range.end(),
                total_pages,
            });
            return Vec::new();
        };

        tracing::info!(
            "Catalog {} has {} pages; collecting pages {}-{}",
            self.category_id,
            total_pages,
            pages.start(),
            pages.end()
        );

        let mut book_urls = Vec::new();
        let mut first_page = Some(first_page);
        for page_number in pages {
            let page_url = match self.page_url(page_number) {
                Ok(url) => url,
                Err(e) => {
                    self.report_page_skip(&self.base_url, &e);
                    continue;
                }
            };

            // Page 1 was already fetched to learn the page count
            let cached = if page_number == 1 { first_page.take() } else { None };
            let page = match cached {
                Some(page) => page,
                None => match self.fetch_category_page(&page_url).await.result {
                    Ok(page) => page,
                    Err(e) if e.is_cancelled() => break,
                    Err(e) => {
                        self.report_page_skip(&page_url, &e);
                        continue;
                    }
                },
            };

            for href in &page.book_urls {
                match page_url.join(href) {
                    Ok(url) => book_urls.push(url),
                    Err(e) => {
                        tracing::warn!("Ignoring book link '{}' on {}: {}", href, page_url, e);
                    }
                }
            }
        }

        tracing::info!("Collected {} book URLs", book_urls.len());
        book_urls
    }

    /// Fetches and extracts one catalog page under the retry policy
    async fn fetch_category_page(&self, page_url: &Url) -> RetryOutcome<CategoryPageResult> {
        self.policy
            .run(page_url.as_str(), &self.cancel, self.sink.as_ref(), || async {
                let html = self.fetcher.fetch_page(page_url).await?;
                extract_category_page(&html)
            })
            .await
    }

    fn page_url(&self, page: u32) -> Result<Url, HarvestError> {
        Ok(category_page_url(&self.base_url, self.category_id, page)?)
    }

    fn report_page_skip(&self, url: &Url, error: &HarvestError) {
        self.sink.record(CrawlEvent::PageSkipped {
            url: url.to_string(),
            reason: SkipReason::from_error(error),
            message: error.to_string(),
        });
    }
}
