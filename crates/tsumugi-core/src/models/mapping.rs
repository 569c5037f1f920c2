use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key used to look up an episode mapping, by whichever external id is
/// available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKey {
    Anilist(u64),
    Mal(u64),
}

impl std::fmt::Display for MappingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anilist(id) => write!(f, "anilist:{id}"),
            Self::Mal(id) => write!(f, "mal:{id}"),
        }
    }
}

/// Cross-service ids carried by an episode mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingIds {
    pub anilist_id: Option<u64>,
    pub mal_id: Option<u64>,
    pub anidb_id: Option<u64>,
    pub kitsu_id: Option<u64>,
}

/// Per-episode broadcast metadata from the mapping service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMeta {
    #[serde(rename = "episodeNumber")]
    pub episode_number: Option<u32>,
    #[serde(rename = "seasonNumber")]
    pub season_number: Option<u32>,
    #[serde(rename = "absoluteEpisodeNumber")]
    pub absolute_episode_number: Option<u32>,
    #[serde(rename = "anidbEid")]
    pub anidb_eid: Option<u64>,
    #[serde(rename = "airDate")]
    pub air_date: Option<String>,
}

/// Episode mapping for one media, keyed by AniDB-style episode keys
/// ("1", "2", … for regular episodes, "S1", "S2", … for specials).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMapping {
    #[serde(default)]
    pub mappings: MappingIds,
    #[serde(default)]
    pub episodes: HashMap<String, EpisodeMeta>,
    #[serde(rename = "episodeCount")]
    pub episode_count: Option<u32>,
    #[serde(rename = "specialCount")]
    pub special_count: Option<u32>,
}

impl EpisodeMapping {
    /// Look up a regular episode by its relative number.
    pub fn episode(&self, number: u32) -> Option<&EpisodeMeta> {
        self.episodes.get(&number.to_string())
    }

    /// Look up any episode by its AniDB-style key.
    pub fn episode_by_key(&self, key: &str) -> Option<&EpisodeMeta> {
        self.episodes.get(key)
    }

    /// Lowest regular episode number present (0 for episode-zero shows).
    pub fn first_episode_number(&self) -> Option<u32> {
        self.episodes
            .keys()
            .filter_map(|k| k.parse::<u32>().ok())
            .min()
    }

    /// Season the mapping service reports for the first episode.
    pub fn season_of_first_episode(&self) -> Option<u32> {
        let first = self.first_episode_number()?;
        self.episode(first).and_then(|m| m.season_number)
    }

    pub fn has_episode_zero(&self) -> bool {
        self.first_episode_number() == Some(0)
    }
}
