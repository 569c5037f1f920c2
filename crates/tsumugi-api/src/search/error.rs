use thiserror::Error;

use tsumugi_core::error::SourceError;

/// Errors from the title-search client.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<SearchError> for SourceError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Api { status: 404, .. } => SourceError::NotFound,
            other => SourceError::Remote(other.to_string()),
        }
    }
}
