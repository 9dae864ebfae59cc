//! URL handling module for Library Harvest
//!
//! This module knows the URL scheme of the library site (book pages and
//! catalog pages) and turns remote URLs and titles into safe local filenames.

mod filename;

pub use filename::{filename_from_url, sanitize_filename};

use url::Url;

/// Builds the detail page URL of book `book_id`: `{base}/b{id}/`
///
/// # Examples
///
/// ```
/// use library_harvest::url::book_url;
/// use url::Url;
///
/// let base = Url::parse("https://tululu.org/").unwrap();
/// assert_eq!(book_url(&base, 239).unwrap().as_str(), "https://tululu.org/b239/");
/// ```
pub fn book_url(base: &Url, book_id: u32) -> Result<Url, url::ParseError> {
    base.join(&format!("/b{}/", book_id))
}

/// Builds the URL of page `page` of catalog category `category_id`:
/// `{base}/l{category}/{page}/`
pub fn category_page_url(base: &Url, category_id: u32, page: u32) -> Result<Url, url::ParseError> {
    base.join(&format!("/l{}/{}/", category_id, page))
}

/// Extracts the book id from a book page URL
///
/// Returns the id as written in the path (`/b239/` gives `"239"`), or `None`
/// if the path does not look like a book page.
pub fn book_id(url: &Url) -> Option<String> {
    let segment = url.path().trim_matches('/');
    let id = segment.strip_prefix('b')?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// Builds the book URLs for an inclusive id range
///
/// The range is normalized so that the smaller id comes first; an `end_id`
/// of 0 means "only `start_id`".
pub fn book_urls_for_range(base: &Url, start_id: u32, end_id: u32) -> Result<Vec<Url>, url::ParseError> {
    let start_id = start_id.max(1);
    let (start, end) = match end_id {
        0 => (start_id, start_id),
        end if end < start_id => (end, start_id),
        end => (start_id, end),
    };

    (start..=end).map(|id| book_url(base, id)).collect()
}
