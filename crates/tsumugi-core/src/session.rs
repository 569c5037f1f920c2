//! Reconciliation session: scheduler, caches, and scan log with an
//! explicit lifecycle.
//!
//! Everything mutable the engine shares lives here. Both caches are
//! write-once-per-key, so parallel test runs and concurrent relation
//! branches need no locking beyond the scheduler's own in-flight
//! de-duplication. Dropping the session (or a cancelled scan future)
//! is safe: settled cache entries simply go away with it.

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::{self, FutureExt};

use crate::config::EngineConfig;
use crate::error::SourceError;
use crate::models::{EpisodeMapping, MappingKey, MediaNode};
use crate::scan_log::{ScanLog, ScanLogEntry};
use crate::scheduler::{FetchScheduler, RequestCache};
use crate::source::{CatalogSource, MappingSource};

pub struct ReconciliationSession {
    scan_id: String,
    scheduler: FetchScheduler,
    media_cache: RequestCache<u64, MediaNode>,
    mapping_cache: RequestCache<MappingKey, EpisodeMapping>,
    scan_log: Mutex<ScanLog>,
}

impl ReconciliationSession {
    /// Open a session for one reconciliation run.
    pub fn open(scan_id: impl Into<String>, config: &EngineConfig) -> Self {
        let scan_id = scan_id.into();
        tracing::debug!(scan_id = %scan_id, "Opening reconciliation session");
        Self {
            scan_id,
            scheduler: FetchScheduler::new(&config.scheduler.to_scheduler_config()),
            media_cache: RequestCache::new(),
            mapping_cache: RequestCache::new(),
            scan_log: Mutex::new(ScanLog::new(config.log.capacity)),
        }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn scheduler(&self) -> &FetchScheduler {
        &self.scheduler
    }

    /// Close the session, clearing caches and returning the scan log.
    pub fn close(self) -> Vec<ScanLogEntry> {
        tracing::debug!(scan_id = %self.scan_id, "Closing reconciliation session");
        match self.scan_log.into_inner() {
            Ok(log) => log.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    /// Append a diagnostic line for a path.
    pub fn log(&self, path: impl Into<String>, message: impl Into<String>) {
        if let Ok(mut log) = self.scan_log.lock() {
            log.push(path, message);
        }
    }

    /// Fetch a media node by id, memoized for the session.
    ///
    /// Concurrent callers for the same id share one in-flight request.
    pub async fn media<C: CatalogSource>(
        &self,
        catalog: &C,
        id: u64,
    ) -> Result<MediaNode, SourceError> {
        self.media_cache
            .get_or_fetch(id, || self.scheduler.run(catalog.fetch_media(id)))
            .await
    }

    /// Fetch several media, going to the catalog only for ids nobody
    /// has settled or started fetching yet.
    ///
    /// Missing ids are reserved through their cache cells against one
    /// shared batch request, so a concurrent single fetch for the same
    /// id joins that request instead of duplicating it. Ids unknown to
    /// the catalog are dropped from the result.
    pub async fn media_batch<C: CatalogSource>(
        &self,
        catalog: &C,
        ids: &[u64],
    ) -> Result<Vec<MediaNode>, SourceError> {
        let (missing, contested) = self.media_cache.partition_pending(ids).await;

        if !missing.is_empty() {
            let batch = self
                .scheduler
                .run(catalog.fetch_media_batch(&missing))
                .shared();
            let reservations = missing.iter().map(|&id| {
                let batch = batch.clone();
                self.media_cache.get_or_fetch(id, move || async move {
                    let fetched = batch.await?;
                    fetched
                        .into_iter()
                        .find(|m| m.id == id)
                        .ok_or(SourceError::NotFound)
                })
            });
            for result in future::join_all(reservations).await {
                match result {
                    Ok(_) | Err(SourceError::NotFound) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        // Ids someone else is fetching right now: await their result,
        // refetching singly only if that fetch failed.
        for id in contested {
            let fetched = self
                .media_cache
                .get_or_fetch(id, || self.scheduler.run(catalog.fetch_media(id)))
                .await;
            match fetched {
                Ok(_) | Err(SourceError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }

        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(media) = self.media_cache.get(&id).await {
                out.push(media);
            }
        }
        Ok(out)
    }

    /// Peek the media cache without fetching.
    pub async fn cached_media(&self, id: u64) -> Option<MediaNode> {
        self.media_cache.get(&id).await
    }

    /// All media settled in the cache, keyed by id.
    pub async fn cached_media_map(&self) -> HashMap<u64, MediaNode> {
        self.media_cache
            .values()
            .await
            .into_iter()
            .map(|m| (m.id, m))
            .collect()
    }

    /// Fetch an episode mapping, memoized for the session.
    pub async fn mapping<M: MappingSource>(
        &self,
        source: &M,
        key: MappingKey,
    ) -> Result<EpisodeMapping, SourceError> {
        self.mapping_cache
            .get_or_fetch(key, || self.scheduler.run(source.fetch_mapping(key)))
            .await
    }
}
