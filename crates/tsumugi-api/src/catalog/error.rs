use thiserror::Error;

use tsumugi_core::error::SourceError;

/// Errors from the media catalog client.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("media {0} not found")]
    NotFound(u64),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<CatalogError> for SourceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => SourceError::NotFound,
            CatalogError::Api { status: 404, .. } => SourceError::NotFound,
            other => SourceError::Remote(other.to_string()),
        }
    }
}
