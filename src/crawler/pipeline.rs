//! Per-book pipeline
//!
//! Fetches one book detail page, extracts it, downloads the requested
//! assets and assembles the [`BookRecord`]. A single call is one attempt;
//! retrying is the [`Coordinator`](crate::crawler::Coordinator)'s job.

use crate::config::OutputConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::extract_book_page;
use crate::output::{CrawlEvent, EventSink};
use crate::url::filename_from_url;
use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// One successfully processed book
///
/// Serialized with the keys the site renderer reads: `img_src` and
/// `book_path` hold the relative asset paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,

    /// Relative path of the downloaded cover, empty if not downloaded
    #[serde(rename = "img_src")]
    pub cover_asset_path: String,

    /// Relative path of the downloaded text, empty if not downloaded
    #[serde(rename = "book_path")]
    pub text_asset_path: String,

    pub genres: Vec<String>,
}

/// Which assets to leave out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipOptions {
    pub skip_text: bool,
    pub skip_images: bool,
}

impl SkipOptions {
    /// True when there is nothing to download, so nothing to request at all
    pub fn skips_everything(&self) -> bool {
        self.skip_text && self.skip_images
    }
}

/// Result of processing one book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookOutcome {
    Record(BookRecord),

    /// Both skip flags were set; no request was made
    Skipped,
}

/// Where downloaded assets go
///
/// Files land in `root/texts_dir` and `root/images_dir`; records store the
/// paths relative to `root`, always with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    pub root: PathBuf,
    pub texts_dir: String,
    pub images_dir: String,
}

impl AssetLayout {
    pub fn new(root: impl Into<PathBuf>, texts_dir: &str, images_dir: &str) -> Self {
        Self {
            root: root.into(),
            texts_dir: texts_dir.to_string(),
            images_dir: images_dir.to_string(),
        }
    }

    /// Layout from the output config; an empty destination folder means the
    /// current directory
    pub fn from_config(config: &OutputConfig) -> Self {
        let root = if config.dest_folder.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&config.dest_folder)
        };
        Self::new(root, &config.texts_dir, &config.images_dir)
    }

    pub fn texts_path(&self) -> PathBuf {
        self.root.join(&self.texts_dir)
    }

    pub fn images_path(&self) -> PathBuf {
        self.root.join(&self.images_dir)
    }

    fn relative_path(dir: &str, filename: &str) -> String {
        let dir = dir.trim_end_matches(&['/', '\\'][..]).replace('\\', "/");
        format!("{}/{}", dir, filename)
    }
}

/// Processes single books
pub struct BookPipeline {
    fetcher: Fetcher,
    layout: AssetLayout,
    sink: Arc<dyn EventSink>,
}

impl BookPipeline {
    pub fn new(fetcher: Fetcher, layout: AssetLayout, sink: Arc<dyn EventSink>) -> Self {
        Self {
            fetcher,
            layout,
            sink,
        }
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Runs one attempt for the book at `book_url`
    ///
    /// # Flow
    ///
    /// 1. Both skip flags set: return `Skipped` without any request
    /// 2. Fetch the detail page (a redirect means the book does not exist)
    /// 3. Extract title, author, genres, cover and text links
    /// 4. Download the text as `"{title}.txt"` unless skipped or absent
    /// 5. Download the cover under its URL basename unless skipped
    ///
    /// Asset failures are wrapped in [`HarvestError::AssetFetch`], which keeps
    /// connection failures retryable.
    pub async fn process(
        &self,
        book_url: &Url,
        options: SkipOptions,
    ) -> Result<BookOutcome, HarvestError> {
        if options.skips_everything() {
            return Ok(BookOutcome::Skipped);
        }

        let html = self.fetcher.fetch_page(book_url).await?;
        let details = extract_book_page(&html)?;

        let mut text_asset_path = String::new();
        if !options.skip_text {
            if details.text_url.is_empty() {
                self.sink.record(CrawlEvent::TextMissing {
                    url: book_url.to_string(),
                    title: details.title.clone(),
                });
            } else {
                let text_url = book_url.join(&details.text_url)?;
                let filename = self
                    .download(
                        &text_url,
                        &self.layout.texts_path(),
                        &format!("{}.txt", details.title),
                    )
                    .await?;
                text_asset_path = AssetLayout::relative_path(&self.layout.texts_dir, &filename);
            }
        }

        let mut cover_asset_path = String::new();
        if !options.skip_images && !details.cover_url.is_empty() {
            let cover_url = book_url.join(&details.cover_url)?;
            let filename = self
                .download(
                    &cover_url,
                    &self.layout.images_path(),
                    &filename_from_url(&cover_url),
                )
                .await?;
            cover_asset_path = AssetLayout::relative_path(&self.layout.images_dir, &filename);
        }

        Ok(BookOutcome::Record(BookRecord {
            title: details.title,
            author: details.author,
            cover_asset_path,
            text_asset_path,
            genres: details.genres,
        }))
    }

    async fn download(
        &self,
        url: &Url,
        dest_dir: &Path,
        preferred_filename: &str,
    ) -> Result<String, HarvestError> {
        self.fetcher
            .fetch_asset(url, dest_dir, preferred_filename)
            .await
            .map_err(|e| HarvestError::AssetFetch {
                url: url.to_string(),
                source: Box::new(e),
            })
    }
}
