//! Trait definitions for the remote services the engine consumes.
//!
//! Client crates implement these, letting the reconciler stay agnostic
//! of the concrete catalog, mapping, and search providers.

use std::future::Future;

use crate::error::SourceError;
use crate::models::{EpisodeMapping, MappingKey, MediaNode};

/// Catalog lookups by id.
pub trait CatalogSource: Send + Sync {
    /// Fetch a single media with its relation edges.
    fn fetch_media(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<MediaNode, SourceError>> + Send;

    /// Fetch several media in as few requests as the provider allows.
    fn fetch_media_batch(
        &self,
        ids: &[u64],
    ) -> impl Future<Output = Result<Vec<MediaNode>, SourceError>> + Send;
}

/// Episode-mapping lookups.
pub trait MappingSource: Send + Sync {
    fn fetch_mapping(
        &self,
        key: MappingKey,
    ) -> impl Future<Output = Result<EpisodeMapping, SourceError>> + Send;
}

/// A ranked title-search suggestion with the provider's own confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleCandidate {
    pub media_id: Option<u64>,
    pub title: String,
    pub confidence: f64,
}

/// Free-text title search, used as a fallback when the user's own list
/// yields no acceptable match.
pub trait TitleSearchSource: Send + Sync {
    /// Candidates ordered best-first by the provider.
    fn search_title(
        &self,
        keyword: &str,
    ) -> impl Future<Output = Result<Vec<TitleCandidate>, SourceError>> + Send;
}
