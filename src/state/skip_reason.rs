use crate::HarvestError;
use std::fmt;

/// Why a book or catalog page was permanently excluded from the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// The page did not have the expected HTML structure (removed or banned book)
    PageStructure,

    /// The request was redirected: the book or page does not exist
    NotFound,

    /// The server answered with a client or server error status
    HttpStatus,

    /// A text or cover download failed
    AssetFetch,

    /// Connection failures hit the configured attempt cap
    RetriesExhausted,

    /// Writing to the local filesystem failed
    LocalIo,

    /// Anything else (unexpected client errors, bad URLs)
    Other,
}

impl SkipReason {
    /// Classifies the error that ended a book or page
    pub fn from_error(err: &HarvestError) -> Self {
        match err {
            HarvestError::PageStructure(_) => Self::PageStructure,
            HarvestError::RedirectDetected { .. } => Self::NotFound,
            HarvestError::HttpStatus { .. } => Self::HttpStatus,
            HarvestError::AssetFetch { .. } => Self::AssetFetch,
            HarvestError::RetriesExhausted { .. } => Self::RetriesExhausted,
            HarvestError::Io(_) => Self::LocalIo,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageStructure => "page_structure",
            Self::NotFound => "not_found",
            Self::HttpStatus => "http_status",
            Self::AssetFetch => "asset_fetch",
            Self::RetriesExhausted => "retries_exhausted",
            Self::LocalIo => "local_io",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
