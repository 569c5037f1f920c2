//! Library reconciliation.
//!
//! Groups local files, matches each group to a catalog media, re-derives
//! episode numbers through the relation graph and the episode-mapping
//! service, and assembles the derived `LibraryEntry` records.
//!
//! Remote failures degrade per-group: the affected files land in the
//! unmatched bucket and the scan carries on with filename-only
//! information. Only scan-level problems (a missing root) are fatal,
//! and those are raised before reconciliation starts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use crate::classify::{self, EpisodeKind};
use crate::config::EngineConfig;
use crate::matcher;
use crate::models::{
    LibraryEntry, ListStatus, LocalFile, MappingKey, MediaNode, RelationType,
};
use crate::normalize;
use crate::relations;
use crate::session::ReconciliationSession;
use crate::source::{CatalogSource, MappingSource, TitleSearchSource};

/// Knobs for one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Minimum similarity rating for a hint-pool match.
    pub min_rating: f64,
    /// Minimum provider confidence for a search fallback suggestion.
    pub search_confidence_floor: f64,
    /// Tracking status suggested for newly matched media.
    pub default_add_status: ListStatus,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            min_rating: 0.5,
            search_confidence_floor: 0.7,
            default_add_status: ListStatus::Planning,
        }
    }
}

impl ReconcileOptions {
    /// Options taken from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_rating: config.matcher.min_rating,
            search_confidence_floor: config.matcher.search_confidence_floor,
            default_add_status: ListStatus::Planning,
        }
    }
}

/// Result of one reconciliation run.
///
/// `to_add` reports media that should be added to the user's list under
/// the default status; performing that addition is the caller's side
/// effect, not the engine's.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub accepted: Vec<LocalFile>,
    pub rejected: Vec<LocalFile>,
    pub unmatched: Vec<LocalFile>,
    /// Locked and ignored files, passed through byte-for-byte.
    pub passthrough: Vec<LocalFile>,
    /// Media matched this run, deduplicated, sorted by id.
    pub matched_media: Vec<MediaNode>,
    pub to_add: Vec<u64>,
}

/// Reconcile local files against the catalog.
///
/// `hint` is the user's existing list; the title-search service is only
/// consulted for groups that nothing in the hint pool explains.
#[tracing::instrument(skip_all, fields(scan_id = %session.scan_id(), files = files.len()))]
pub async fn reconcile<C, M, T>(
    session: &ReconciliationSession,
    catalog: &C,
    mapping_source: &M,
    search: &T,
    files: Vec<LocalFile>,
    hint: &[MediaNode],
    options: &ReconcileOptions,
) -> ReconcileOutcome
where
    C: CatalogSource,
    M: MappingSource,
    T: TitleSearchSource,
{
    let mut outcome = ReconcileOutcome::default();
    let mut media_by_id: HashMap<u64, MediaNode> = HashMap::new();
    let hint_ids: HashSet<u64> = hint.iter().map(|m| m.id).collect();

    // Locked and ignored files are never recomputed.
    let mut pending = Vec::new();
    for file in files {
        if file.locked || file.ignored {
            outcome.passthrough.push(file);
        } else {
            pending.push(file);
        }
    }

    // Files matched on a previous scan keep their match; only their
    // media needs to be known for entry building.
    let mut unmatched_pending = Vec::new();
    for file in pending {
        match file.media_id {
            Some(id) => {
                if let Some(media) = resolve_known_media(session, catalog, hint, id).await {
                    media_by_id.insert(id, media);
                    outcome.accepted.push(file);
                } else {
                    session.log(
                        file.path.display().to_string(),
                        format!("previously matched media {id} is gone from the catalog"),
                    );
                    outcome.unmatched.push(file);
                }
            }
            None => unmatched_pending.push(file),
        }
    }

    // Group by normalized title and parent folder so one folder of
    // mixed-season files cannot absorb another season's episodes.
    let groups = group_files(unmatched_pending, &mut outcome.unmatched);

    for (key, group) in groups {
        let candidate_title = key.title.clone();
        let resolved =
            resolve_group_media(session, catalog, search, &candidate_title, hint, options).await;

        let Some(media) = resolved else {
            for file in group {
                session.log(
                    file.path.display().to_string(),
                    format!("no confident match for '{candidate_title}'"),
                );
                outcome.unmatched.push(file);
            }
            continue;
        };

        if !hint_ids.contains(&media.id) && !outcome.to_add.contains(&media.id) {
            outcome.to_add.push(media.id);
        }

        let (mut accepted, rejected) = split_group_by_tolerance(group, &media);
        for file in rejected {
            session.log(
                file.path.display().to_string(),
                format!(
                    "rejected from '{}': rating below the group maximum",
                    media.title.preferred()
                ),
            );
            outcome.rejected.push(file);
        }

        for file in &mut accepted {
            file.media_id = Some(media.id);
            hydrate_episode(session, catalog, mapping_source, &media, file).await;
            session.log(
                file.path.display().to_string(),
                format!(
                    "matched to '{}' (episode {:?})",
                    media.title.preferred(),
                    file.metadata.episode
                ),
            );
        }
        outcome.accepted.append(&mut accepted);
        media_by_id.insert(media.id, media);
    }

    outcome.matched_media = {
        let mut media: Vec<MediaNode> = media_by_id.into_values().collect();
        media.sort_unstable_by_key(|m| m.id);
        media
    };
    outcome.to_add.sort_unstable();

    tracing::info!(
        accepted = outcome.accepted.len(),
        rejected = outcome.rejected.len(),
        unmatched = outcome.unmatched.len(),
        passthrough = outcome.passthrough.len(),
        "Reconciliation complete"
    );
    session.log(
        "",
        format!(
            "scan summary: {} matched, {} rejected, {} unmatched",
            outcome.accepted.len(),
            outcome.rejected.len(),
            outcome.unmatched.len()
        ),
    );

    outcome
}

/// Derive `LibraryEntry` records from matched files.
///
/// Pure and deterministic: entries hold exactly the unignored files
/// whose `media_id` equals the entry's id, accuracy is the best rating
/// among those files, and the shared path is their longest common
/// ancestor.
pub fn build_entries(files: &[LocalFile], media_pool: &[MediaNode]) -> Vec<LibraryEntry> {
    let media_by_id: HashMap<u64, &MediaNode> = media_pool.iter().map(|m| (m.id, m)).collect();

    let mut grouped: BTreeMap<u64, Vec<&LocalFile>> = BTreeMap::new();
    for file in files {
        if file.ignored {
            continue;
        }
        if let Some(id) = file.media_id {
            grouped.entry(id).or_default().push(file);
        }
    }

    let mut entries = Vec::new();
    for (media_id, group) in grouped {
        let Some(media) = media_by_id.get(&media_id) else {
            continue;
        };

        let accuracy = group
            .iter()
            .map(|f| {
                let title = f.parsed_title().or(f.folder_title()).unwrap_or(&f.name);
                matcher::rate_media(title, media)
            })
            .fold(0.0, f64::max);

        entries.push(LibraryEntry {
            media_id,
            media: (*media).clone(),
            files: group.iter().map(|f| (*f).clone()).collect(),
            accuracy,
            shared_path: shared_ancestor(&group),
        });
    }
    entries
}

/// Look up an already-assigned media id: hint pool first, then the
/// session cache, then the catalog.
async fn resolve_known_media<C: CatalogSource>(
    session: &ReconciliationSession,
    catalog: &C,
    hint: &[MediaNode],
    id: u64,
) -> Option<MediaNode> {
    if let Some(media) = hint.iter().find(|m| m.id == id) {
        return Some(media.clone());
    }
    match session.media(catalog, id).await {
        Ok(media) => Some(media),
        Err(e) => {
            tracing::warn!(media_id = id, error = %e, "Could not refresh known media");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    title: String,
    normalized: String,
    folder: PathBuf,
}

/// Group files by normalized title and parent folder. Files with no
/// usable title at all drain into `unmatched`.
fn group_files(
    files: Vec<LocalFile>,
    unmatched: &mut Vec<LocalFile>,
) -> BTreeMap<GroupKey, Vec<LocalFile>> {
    let mut groups: BTreeMap<GroupKey, Vec<LocalFile>> = BTreeMap::new();
    for file in files {
        let title = file
            .parsed_title()
            .or(file.folder_title())
            .map(str::to_string);
        let Some(title) = title else {
            unmatched.push(file);
            continue;
        };
        let key = GroupKey {
            normalized: normalize::normalize(&title),
            folder: file.parent_dir().map(PathBuf::from).unwrap_or_default(),
            title,
        };
        groups.entry(key).or_default().push(file);
    }
    groups
}

/// Pick the media for a group: hint pool first, search fallback second.
async fn resolve_group_media<C, T>(
    session: &ReconciliationSession,
    catalog: &C,
    search: &T,
    title: &str,
    hint: &[MediaNode],
    options: &ReconcileOptions,
) -> Option<MediaNode>
where
    C: CatalogSource,
    T: TitleSearchSource,
{
    if let Some((media, rating)) = matcher::best_media(title, hint) {
        if rating >= options.min_rating {
            tracing::debug!(
                title,
                matched = media.title.preferred(),
                rating,
                "Matched against hint pool"
            );
            return Some(media.clone());
        }
    }

    // Nothing in the user's list explains this group; ask the search
    // provider and take its top suggestion above the confidence floor.
    let candidates = match search.search_title(title).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(title, error = %e, "Title search unavailable");
            return None;
        }
    };
    let suggestion = candidates
        .into_iter()
        .find(|c| c.confidence >= options.search_confidence_floor && c.media_id.is_some())?;

    let id = suggestion.media_id?;
    match session.media(catalog, id).await {
        Ok(media) => {
            tracing::debug!(
                title,
                matched = media.title.preferred(),
                confidence = suggestion.confidence,
                "Matched via title search"
            );
            Some(media)
        }
        Err(e) => {
            tracing::warn!(title, media_id = id, error = %e, "Suggested media fetch failed");
            None
        }
    }
}

/// Apply the dual-tolerance rule: a file stays in the group only when
/// both its own-title rating and its folder-title rating sit within
/// tolerance of the group's respective maxima.
fn split_group_by_tolerance(
    group: Vec<LocalFile>,
    media: &MediaNode,
) -> (Vec<LocalFile>, Vec<LocalFile>) {
    let ratings: Vec<(f64, Option<f64>)> = group
        .iter()
        .map(|f| {
            let title_rating = f
                .parsed_title()
                .map(|t| matcher::rate_media(t, media))
                .unwrap_or(0.0);
            let folder_rating = f.folder_title().map(|t| matcher::rate_media(t, media));
            (title_rating, folder_rating)
        })
        .collect();

    let max_title = ratings.iter().map(|r| r.0).fold(0.0, f64::max);
    let max_folder = ratings.iter().filter_map(|r| r.1).fold(0.0, f64::max);

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for (file, (title_rating, folder_rating)) in group.into_iter().zip(ratings) {
        let title_ok = matcher::within_tolerance(title_rating, max_title);
        let folder_ok = folder_rating
            .map(|r| matcher::within_tolerance(r, max_folder))
            .unwrap_or(true);
        if title_ok && folder_ok {
            accepted.push(file);
        } else {
            rejected.push(file);
        }
    }
    (accepted, rejected)
}

/// Re-derive a file's episode metadata for its matched media.
///
/// Enrichment is best effort: a missing mapping or prequel leaves the
/// filename-parsed number in place.
async fn hydrate_episode<C, M>(
    session: &ReconciliationSession,
    catalog: &C,
    mapping_source: &M,
    media: &MediaNode,
    file: &mut LocalFile,
) where
    C: CatalogSource,
    M: MappingSource,
{
    let kind = classify::classify(&file.name);
    file.metadata.is_special = kind == EpisodeKind::Special;
    file.metadata.is_nc = kind == EpisodeKind::Credits;
    file.metadata.is_version = classify::has_version_marker(&file.name);

    let mapping = match session
        .mapping(mapping_source, MappingKey::Anilist(media.id))
        .await
    {
        Ok(mapping) => Some(mapping),
        Err(e) => {
            tracing::debug!(
                media_id = media.id,
                error = %e,
                "Episode mapping unavailable, using filename data only"
            );
            None
        }
    };

    let split_cour = file.has_split_cour_marker();
    let season = relations::resolve_season(
        file.parsed_info.as_ref(),
        &file.parsed_folder_info,
        mapping.as_ref(),
        split_cour,
    );

    let Some(relative) = file.relative_episode() else {
        file.metadata.episode = None;
        return;
    };

    let needs_offset = season.is_some_and(|s| s > 1) || split_cour;
    let prequel_episodes = if needs_offset {
        prequel_episode_count(session, catalog, media).await
    } else {
        None
    };
    let mut episode = relations::absolute_episode(relative, season, split_cour, prequel_episodes);

    // Episode 0 is only real for specials and episode-zero catalogs.
    if episode == 0 && !file.metadata.is_special {
        let first_is_zero = mapping
            .as_ref()
            .is_some_and(|m| m.first_episode_number() == Some(0));
        if !first_is_zero {
            tracing::debug!(path = %file.path.display(), "Bumping parsed episode 0 to 1");
            episode = 1;
        }
    }
    file.metadata.episode = Some(episode);

    // Translate the relative number into the mapping's AniDB-style key.
    if let Some(mapping) = &mapping {
        let key = if file.metadata.is_special {
            format!("S{relative}")
        } else {
            relative.to_string()
        };
        if mapping.episode_by_key(&key).is_some() {
            file.metadata.anidb_episode = Some(key);
        }
    }
}

/// Episode count of the media's prequel, fetching the full node when
/// the edge projection is shallow.
async fn prequel_episode_count<C: CatalogSource>(
    session: &ReconciliationSession,
    catalog: &C,
    media: &MediaNode,
) -> Option<u32> {
    let edge = relations::find_edge(
        media,
        RelationType::Prequel,
        relations::DEFAULT_EDGE_FORMATS,
        false,
    )?;
    if let Some(count) = edge.node.episodes {
        return Some(count);
    }
    match session.media(catalog, edge.node.id).await {
        Ok(full) => full.episodes,
        Err(e) => {
            tracing::debug!(media_id = edge.node.id, error = %e, "Prequel fetch failed");
            None
        }
    }
}

/// Longest common ancestor path of a file group.
fn shared_ancestor(files: &[&LocalFile]) -> PathBuf {
    let mut iter = files.iter().filter_map(|f| f.parent_dir());
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };
    let mut shared = first.to_path_buf();
    for dir in iter {
        while !dir.starts_with(&shared) {
            if !shared.pop() {
                return PathBuf::new();
            }
        }
    }
    shared
}
