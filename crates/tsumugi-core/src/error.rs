use std::path::PathBuf;

use thiserror::Error;

/// Engine-level errors.
///
/// Only scan-fatal conditions surface here. Per-request remote failures
/// are absorbed during reconciliation: the affected group degrades to
/// the unmatched bucket instead of failing the whole scan.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scan directory missing: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("remote service unavailable: {0}")]
    Remote(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by remote source implementations.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("not found")]
    NotFound,

    #[error("remote error: {0}")]
    Remote(String),
}

impl From<SourceError> for EngineError {
    fn from(e: SourceError) -> Self {
        Self::Remote(e.to_string())
    }
}
