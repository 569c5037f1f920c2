use thiserror::Error;

use tsumugi_core::error::SourceError;

/// Errors from the episode-mapping client.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("no mapping for {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<MappingError> for SourceError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::NotFound(_) => SourceError::NotFound,
            MappingError::Api { status: 404, .. } => SourceError::NotFound,
            other => SourceError::Remote(other.to_string()),
        }
    }
}
