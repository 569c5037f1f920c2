//! Relation-graph traversal and episode-number resolution.
//!
//! Walks PREQUEL/SEQUEL/PARENT/SIDE_STORY/SPIN_OFF/ALTERNATIVE edges to
//! collect related media and to translate per-season episode numbers
//! into absolute ones across prequel chains and split-cour releases.

use std::collections::{HashSet, VecDeque};

use crate::models::{
    Edge, EpisodeMapping, MediaFormat, MediaNode, MediaStatus, ParsedInfo, RelationType,
};
use crate::session::ReconciliationSession;
use crate::source::CatalogSource;

/// Formats considered when following relation edges for episode math.
pub const DEFAULT_EDGE_FORMATS: &[MediaFormat] = &[MediaFormat::Tv, MediaFormat::TvShort];

/// Find a relation edge of the given kind whose node has an allowed
/// format.
///
/// When searching for a SEQUEL and nothing matches, retries once with
/// OVA added to the allowed formats — loosely catalogued sequels often
/// hide behind an OVA entry. Exactly one fallback level, no recursion
/// beyond it.
pub fn find_edge<'a>(
    media: &'a MediaNode,
    relation: RelationType,
    allowed_formats: &[MediaFormat],
    fallback_to_ova: bool,
) -> Option<&'a Edge> {
    let hit = media.relations.iter().find(|edge| {
        edge.relation_type == relation
            && edge
                .node
                .format
                .is_some_and(|f| allowed_formats.contains(&f))
    });

    if hit.is_none()
        && fallback_to_ova
        && relation == RelationType::Sequel
        && !allowed_formats.contains(&MediaFormat::Ova)
    {
        let mut widened = allowed_formats.to_vec();
        widened.push(MediaFormat::Ova);
        return find_edge(media, relation, &widened, false);
    }

    hit
}

/// Collect the full tree of media related to a root node.
///
/// Bounded BFS over the traversable edge kinds, visiting each id at
/// most once and skipping nodes whose status is excluded. Relation data
/// for shallow edge nodes comes through the session cache; a failed
/// fetch degrades to the shallow node rather than aborting traversal.
pub async fn build_tree<C: CatalogSource>(
    session: &ReconciliationSession,
    catalog: &C,
    root: &MediaNode,
    exclude_statuses: &[MediaStatus],
) -> Vec<MediaNode> {
    let mut visited: HashSet<u64> = HashSet::new();
    let mut tree = Vec::new();
    let mut queue: VecDeque<MediaNode> = VecDeque::new();

    visited.insert(root.id);
    queue.push_back(root.clone());

    while let Some(node) = queue.pop_front() {
        for edge in &node.relations {
            if !RelationType::TRAVERSABLE.contains(&edge.relation_type) {
                continue;
            }
            let child = &edge.node;
            if !visited.insert(child.id) {
                continue;
            }
            if child.status.is_some_and(|s| exclude_statuses.contains(&s)) {
                continue;
            }

            // Edge nodes are shallow projections; pull the full node so
            // traversal can continue past them.
            let full = if child.has_relations() {
                child.clone()
            } else {
                match session.media(catalog, child.id).await {
                    Ok(full) => full,
                    Err(e) => {
                        tracing::debug!(
                            media_id = child.id,
                            error = %e,
                            "Relation fetch failed, keeping shallow node"
                        );
                        child.clone()
                    }
                }
            };
            queue.push_back(full);
        }
        tree.push(node);
    }

    tree
}

/// Translate a relative episode number into an absolute one.
///
/// The prequel offset applies only past season 1 or under a split-cour
/// marker; season 1 numbering is already absolute.
pub fn absolute_episode(
    relative: u32,
    season: Option<u32>,
    split_cour: bool,
    prequel_episodes: Option<u32>,
) -> u32 {
    let past_first_season = season.is_some_and(|s| s > 1);
    match prequel_episodes {
        Some(count) if past_first_season || split_cour => count + relative,
        _ => relative,
    }
}

/// Resolve the season for a file.
///
/// Precedence: the mapping service's season for episode 1 wins over the
/// filename-parsed season when the two disagree and no split-cour
/// marker is present; otherwise the parsed season (file-level over
/// folder-level); otherwise `None`, treated as season 1 downstream.
/// Disagreements are logged for review rather than silently trusted.
pub fn resolve_season(
    file: Option<&ParsedInfo>,
    folders: &[ParsedInfo],
    mapping: Option<&EpisodeMapping>,
    split_cour: bool,
) -> Option<u32> {
    let parsed = file
        .and_then(|p| p.season_number())
        .or_else(|| folders.iter().rev().find_map(|p| p.season_number()));
    let mapped = mapping.and_then(|m| m.season_of_first_episode());

    match (mapped, parsed) {
        (Some(m), Some(p)) if m != p && !split_cour => {
            tracing::warn!(
                mapped_season = m,
                parsed_season = p,
                "Season disagreement, preferring mapping service"
            );
            Some(m)
        }
        (_, Some(p)) => Some(p),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::SourceError;
    use crate::models::MediaTitle;

    fn node(id: u64, format: MediaFormat) -> MediaNode {
        MediaNode {
            id,
            format: Some(format),
            title: MediaTitle {
                romaji: Some(format!("Media {id}")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn edge(relation: RelationType, node: MediaNode) -> Edge {
        Edge {
            relation_type: relation,
            node,
        }
    }

    #[test]
    fn test_find_edge_restricts_format() {
        let media = MediaNode {
            id: 1,
            relations: vec![
                edge(RelationType::Sequel, node(2, MediaFormat::Movie)),
                edge(RelationType::Sequel, node(3, MediaFormat::Tv)),
            ],
            ..Default::default()
        };
        let found = find_edge(&media, RelationType::Sequel, DEFAULT_EDGE_FORMATS, true).unwrap();
        assert_eq!(found.node.id, 3);
    }

    #[test]
    fn test_find_edge_ova_fallback_for_sequel() {
        let media = MediaNode {
            id: 1,
            relations: vec![edge(RelationType::Sequel, node(2, MediaFormat::Ova))],
            ..Default::default()
        };
        // TV-only search misses, one OVA fallback hits.
        let found = find_edge(&media, RelationType::Sequel, DEFAULT_EDGE_FORMATS, true).unwrap();
        assert_eq!(found.node.id, 2);

        // No fallback for prequels.
        let media = MediaNode {
            id: 1,
            relations: vec![edge(RelationType::Prequel, node(2, MediaFormat::Ova))],
            ..Default::default()
        };
        assert!(find_edge(&media, RelationType::Prequel, DEFAULT_EDGE_FORMATS, true).is_none());
    }

    #[test]
    fn test_absolute_episode_offsets() {
        // Season 2, prequel with 24 episodes, relative episode 3.
        assert_eq!(absolute_episode(3, Some(2), false, Some(24)), 27);
        // Season 1 stays relative.
        assert_eq!(absolute_episode(3, Some(1), false, Some(24)), 3);
        // Split cour applies the offset even without a season marker.
        assert_eq!(absolute_episode(3, None, true, Some(12)), 15);
        // No prequel count: relative as-is.
        assert_eq!(absolute_episode(3, Some(2), false, None), 3);
    }

    #[test]
    fn test_resolve_season_mapping_wins_on_disagreement() {
        let file = ParsedInfo {
            original: "Show S02E01".into(),
            season: Some("2".into()),
            ..Default::default()
        };
        let mapping: EpisodeMapping = serde_json::from_str(
            r#"{ "episodes": { "1": { "episodeNumber": 1, "seasonNumber": 3 } } }"#,
        )
        .unwrap();

        assert_eq!(
            resolve_season(Some(&file), &[], Some(&mapping), false),
            Some(3)
        );
        // Split cour disables the override.
        assert_eq!(
            resolve_season(Some(&file), &[], Some(&mapping), true),
            Some(2)
        );
    }

    #[test]
    fn test_resolve_season_file_over_folder() {
        let file = ParsedInfo {
            original: "Show S03E01".into(),
            season: Some("3".into()),
            ..Default::default()
        };
        let folder = ParsedInfo {
            original: "Show Season 1".into(),
            season: Some("1".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_season(Some(&file), std::slice::from_ref(&folder), None, false),
            Some(3)
        );
        assert_eq!(resolve_season(None, &[folder], None, false), Some(1));
        assert_eq!(resolve_season(None, &[], None, false), None);
    }

    struct TreeCatalog;

    impl CatalogSource for TreeCatalog {
        async fn fetch_media(&self, id: u64) -> Result<MediaNode, SourceError> {
            // Node 2 links onward to node 4; everything else is a leaf.
            let mut full = node(id, MediaFormat::Tv);
            if id == 2 {
                full.relations = vec![edge(RelationType::Sequel, node(4, MediaFormat::Tv))];
            }
            Ok(full)
        }

        async fn fetch_media_batch(&self, ids: &[u64]) -> Result<Vec<MediaNode>, SourceError> {
            let mut out = Vec::new();
            for &id in ids {
                out.push(self.fetch_media(id).await?);
            }
            Ok(out)
        }
    }

    fn quick_session() -> ReconciliationSession {
        let mut config = EngineConfig::default();
        config.scheduler.min_gap_ms = 0;
        config.scheduler.heavy_use_threshold = 0;
        ReconciliationSession::open("tree-test", &config)
    }

    #[tokio::test]
    async fn test_build_tree_visits_once_and_follows_fetched_edges() {
        let session = quick_session();
        let catalog = TreeCatalog;

        let root = MediaNode {
            id: 1,
            format: Some(MediaFormat::Tv),
            relations: vec![
                edge(RelationType::Sequel, node(2, MediaFormat::Tv)),
                edge(RelationType::SideStory, node(3, MediaFormat::Tv)),
                // Duplicate edge back to an already queued id.
                edge(RelationType::Alternative, node(2, MediaFormat::Tv)),
            ],
            ..Default::default()
        };

        let tree = build_tree(&session, &catalog, &root, &[]).await;
        let mut ids: Vec<u64> = tree.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        // Root, both direct relations, and node 4 discovered through the
        // fetched copy of node 2.
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_build_tree_skips_excluded_status() {
        let session = quick_session();
        let catalog = TreeCatalog;

        let mut unreleased = node(5, MediaFormat::Tv);
        unreleased.status = Some(MediaStatus::NotYetReleased);

        let root = MediaNode {
            id: 1,
            relations: vec![edge(RelationType::Sequel, unreleased)],
            ..Default::default()
        };

        let tree = build_tree(&session, &catalog, &root, &[MediaStatus::NotYetReleased]).await;
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 1);
    }
}
