//! Crawler module for catalog traversal and book collection
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with redirect detection
//! - HTML extraction of book and catalog pages
//! - Connection retry under a fixed backoff
//! - Per-book asset downloads
//! - Overall batch coordination

mod category;
mod coordinator;
mod fetcher;
mod parser;
mod pipeline;
mod retry;

pub use category::{CategoryCrawler, PageRange};
pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, Fetcher};
pub use parser::{extract_book_page, extract_category_page, CategoryPageResult, RawBookDetails};
pub use pipeline::{AssetLayout, BookOutcome, BookPipeline, BookRecord, SkipOptions};
pub use retry::{RetryOutcome, RetryPolicy, DEFAULT_BACKOFF};
