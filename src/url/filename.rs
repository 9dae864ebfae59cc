use url::Url;

/// Longest filename (in bytes) most filesystems accept
const MAX_FILENAME_BYTES: usize = 255;

/// Characters that are not allowed in filenames on common platforms
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Device names Windows refuses as filenames, with or without extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Makes `name` safe to use as a single path component
///
/// # Sanitization Steps
///
/// 1. Drop path separators, reserved punctuation and control characters
/// 2. Trim surrounding whitespace and trailing dots
/// 3. Truncate to 255 bytes on a character boundary
/// 4. Suffix the stem of reserved device names with `_` (`CON.txt` gives `CON_.txt`)
/// 5. An empty result becomes `_`
///
/// # Examples
///
/// ```
/// use library_harvest::url::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Алмазный путь: 1/2.txt"), "Алмазный путь 12.txt");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !RESERVED_CHARS.contains(c) && !c.is_control())
        .collect();

    let mut cleaned = cleaned
        .trim()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string();

    if cleaned.len() > MAX_FILENAME_BYTES {
        let mut cut = MAX_FILENAME_BYTES;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
        cleaned = cleaned.trim_end().to_string();
    }

    if cleaned.is_empty() {
        return "_".to_string();
    }

    let stem_len = cleaned.find('.').unwrap_or(cleaned.len());
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&cleaned[..stem_len]))
    {
        cleaned.insert(stem_len, '_');
    }

    cleaned
}

/// Derives a local filename from the last segment of a URL path
///
/// Percent-escapes are decoded, so `/shots/%D0%BA%D0%BE%D1%82.jpg` yields
/// `кот.jpg`. Returns an empty string when the path has no final segment.
pub fn filename_from_url(url: &Url) -> String {
    let last_segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default();

    match urlencoding::decode(last_segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => last_segment.to_string(),
    }
}
