//! HTML extractors for book detail pages and catalog pages
//!
//! Both extractors are pure functions over the page HTML: no network access,
//! no URL resolution. Relative URLs are returned as found and resolved by the
//! caller against the URL the page was fetched from.
//!
//! Every missing piece of required structure is reported as
//! [`HarvestError::PageStructure`]. The only absence that is not an error is a
//! book without a "download text" link.

use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};

/// Separator between title and author in the book page heading
const TITLE_AUTHOR_DELIMITER: &str = "::";

/// Visible text of the link to a book's plain-text file
const DOWNLOAD_TEXT_LABEL: &str = "скачать txt";

/// Fields extracted from a book detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBookDetails {
    pub title: String,
    pub author: String,

    /// Cover image `src`, possibly relative
    pub cover_url: String,

    /// "Download text" link, possibly relative; empty if the book has no text
    pub text_url: String,

    /// Genre names in document order
    pub genres: Vec<String>,

    /// Reader review texts in document order
    pub comments: Vec<String>,
}

/// Fields extracted from a catalog listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPageResult {
    /// Book page links in document order, possibly relative
    pub book_urls: Vec<String>,

    /// Number of the last catalog page
    pub total_page_count: u32,
}

/// Parses a book detail page
///
/// # Page Layout
///
/// - `#content h1`: `"Title :: Author"`
/// - `table.d_book a` with text `скачать txt`: the text download link
/// - `div.bookimage img[src]`: the cover
/// - `#content span.d_book a`: genres
/// - `#content .texts .black`: reader comments
///
/// # Example
///
/// ```
/// use library_harvest::crawler::extract_book_page;
///
/// let html = r#"<div id="content"><h1>Алиби :: Агата Кристи</h1>
///     <div class="bookimage"><img src="/shots/1.jpg"></div>
///     <table class="d_book"><tr><td></td></tr></table></div>"#;
/// let details = extract_book_page(html).unwrap();
/// assert_eq!(details.title, "Алиби");
/// assert_eq!(details.author, "Агата Кристи");
/// assert_eq!(details.text_url, "");
/// ```
pub fn extract_book_page(html: &str) -> Result<RawBookDetails, HarvestError> {
    let document = Html::parse_document(html);

    let (title, author) = extract_title_and_author(&document)?;
    let text_url = extract_text_url(&document)?;

    let cover_url = document
        .select(&selector("div.bookimage img")?)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .ok_or_else(|| HarvestError::PageStructure("book page has no cover image".to_string()))?;

    let genres = document
        .select(&selector("#content span.d_book a")?)
        .map(element_text)
        .collect();

    let black = selector(".black")?;
    let comments = document
        .select(&selector("#content .texts")?)
        .filter_map(|block| block.select(&black).next())
        .map(element_text)
        .collect();

    Ok(RawBookDetails {
        title,
        author,
        cover_url,
        text_url,
        genres,
        comments,
    })
}

/// Parses a catalog listing page
///
/// Book entries are the `.d_book` blocks (the first link of each block points
/// at the book page). The page count is the text of the last `a.npage`
/// pagination link.
pub fn extract_category_page(html: &str) -> Result<CategoryPageResult, HarvestError> {
    let document = Html::parse_document(html);

    let link = selector("a[href]")?;
    let mut book_urls = Vec::new();
    for (position, entry) in document.select(&selector(".d_book")?).enumerate() {
        let href = entry
            .select(&link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| {
                HarvestError::PageStructure(format!(
                    "catalog entry #{} has no book link",
                    position + 1
                ))
            })?;
        book_urls.push(href.trim().to_string());
    }

    let last_page_link = document
        .select(&selector("a.npage")?)
        .last()
        .ok_or_else(|| {
            HarvestError::PageStructure("catalog page has no pagination links".to_string())
        })?;

    let last_page_text = element_text(last_page_link);
    let total_page_count = last_page_text
        .parse::<u32>()
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(|| {
            HarvestError::PageStructure(format!(
                "last pagination link '{}' is not a page number",
                last_page_text
            ))
        })?;

    Ok(CategoryPageResult {
        book_urls,
        total_page_count,
    })
}

fn extract_title_and_author(document: &Html) -> Result<(String, String), HarvestError> {
    let heading = document
        .select(&selector("#content h1")?)
        .next()
        .map(element_text)
        .ok_or_else(|| HarvestError::PageStructure("book page has no heading".to_string()))?;

    let parts: Vec<&str> = heading.split(TITLE_AUTHOR_DELIMITER).map(str::trim).collect();
    match parts.as_slice() {
        [title, author] if !title.is_empty() && !author.is_empty() => {
            Ok((title.to_string(), author.to_string()))
        }
        _ => Err(HarvestError::PageStructure(format!(
            "heading '{}' is not in 'title {} author' form",
            heading, TITLE_AUTHOR_DELIMITER
        ))),
    }
}

/// Returns the text download link, or an empty string if the book has none
fn extract_text_url(document: &Html) -> Result<String, HarvestError> {
    let info_table = document
        .select(&selector("table.d_book")?)
        .next()
        .ok_or_else(|| HarvestError::PageStructure("book page has no info table".to_string()))?;

    let url = info_table
        .select(&selector("a[href]")?)
        .find(|a| element_text(*a) == DOWNLOAD_TEXT_LABEL)
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .unwrap_or_default();

    Ok(url)
}

fn selector(css: &str) -> Result<Selector, HarvestError> {
    Selector::parse(css)
        .map_err(|e| HarvestError::PageStructure(format!("invalid selector '{}': {:?}", css, e)))
}

/// Collects the element's text with surrounding whitespace removed
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
