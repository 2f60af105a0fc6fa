//! Error types for the feed normalization engine

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors that can occur while normalizing a catalog response
///
/// "Nothing found" outcomes (no classes, no search match, no detail) are not
/// errors: operations return an empty vector or `Ok(None)` for them.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// A required structural node is missing from the response
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Download extraction produced no URL
    #[error("No download link: {0}")]
    NoDownloadLink(String),

    /// Tag-tree body is not well-formed enough to be read
    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Flat-record body is not valid JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Site URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Site declares a parse mode no strategy handles
    #[error("Unknown parse mode: {0}")]
    UnknownParseMode(String),

    /// Configuration error (from vopconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl FeedError {
    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a no-download-link error
    pub fn no_download_link(msg: impl Into<String>) -> Self {
        Self::NoDownloadLink(msg.into())
    }

    /// True for every error caused by the shape of the upstream body
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FeedError::MalformedResponse(_) | FeedError::Xml(_) | FeedError::Json(_)
        )
    }

    /// True when the body was readable but held no download link
    pub fn is_no_download_link(&self) -> bool {
        matches!(self, FeedError::NoDownloadLink(_))
    }
}
