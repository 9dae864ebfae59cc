//! Output module for crawl events, records and statistics
//!
//! This module handles:
//! - Routing skip, retry and informational events to a sink
//! - Writing the collected record set as JSON
//! - Counting and printing per-run statistics

mod records;
pub mod stats;
mod traits;

pub use records::{read_records, write_records};
pub use stats::{print_statistics, RunStatistics};
pub use traits::{CrawlEvent, EventSink, MemorySink, TracingSink};
