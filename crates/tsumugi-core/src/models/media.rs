use serde::{Deserialize, Serialize};

/// A single title with language variants, as the catalog reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    #[serde(rename = "userPreferred")]
    pub user_preferred: Option<String>,
    pub native: Option<String>,
}

impl MediaTitle {
    /// Returns the best available display title.
    pub fn preferred(&self) -> &str {
        self.user_preferred
            .as_deref()
            .or(self.romaji.as_deref())
            .or(self.english.as_deref())
            .or(self.native.as_deref())
            .unwrap_or("Unknown")
    }

    /// All non-empty title variants.
    pub fn variants(&self) -> Vec<&str> {
        [
            self.romaji.as_deref(),
            self.english.as_deref(),
            self.user_preferred.as_deref(),
            self.native.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Catalog media format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    #[serde(other)]
    Unknown,
}

/// Catalog airing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
    #[serde(other)]
    Unknown,
}

/// Broadcast season quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaSeason {
    Winter,
    Spring,
    Summer,
    Fall,
}

/// Kind of relation edge between two catalog media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Prequel,
    Sequel,
    Parent,
    SideStory,
    SpinOff,
    Alternative,
    #[serde(other)]
    Other,
}

impl RelationType {
    /// Edge kinds followed when building a relation tree.
    pub const TRAVERSABLE: &'static [RelationType] = &[
        Self::Prequel,
        Self::Sequel,
        Self::Parent,
        Self::SideStory,
        Self::SpinOff,
        Self::Alternative,
    ];
}

/// Next scheduled broadcast, when the media is airing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAiringEpisode {
    pub episode: u32,
    #[serde(rename = "airingAt")]
    pub airing_at: Option<i64>,
}

/// A relation edge to another media node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "relationType")]
    pub relation_type: RelationType,
    pub node: MediaNode,
}

/// Canonical catalog media node.
///
/// One shape for every projection the remote returns (full, shallow
/// relation nodes, search hits). Capability checks replace nominal
/// sub-types: a shallow node simply has no relations or episode count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaNode {
    pub id: u64,
    #[serde(rename = "idMal")]
    pub id_mal: Option<u64>,
    pub title: MediaTitle,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub episodes: Option<u32>,
    pub format: Option<MediaFormat>,
    pub season: Option<MediaSeason>,
    pub status: Option<MediaStatus>,
    #[serde(default)]
    pub relations: Vec<Edge>,
    #[serde(rename = "nextAiringEpisode")]
    pub next_airing_episode: Option<NextAiringEpisode>,
}

impl MediaNode {
    /// Whether this node carries its own relation edges.
    pub fn has_relations(&self) -> bool {
        !self.relations.is_empty()
    }

    /// Whether this node knows its total episode count.
    pub fn has_episode_count(&self) -> bool {
        self.episodes.is_some()
    }

    /// Collect all title strings (variants plus synonyms).
    pub fn all_titles(&self) -> Vec<&str> {
        let mut titles = self.title.variants();
        for s in &self.synonyms {
            titles.push(s.as_str());
        }
        titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_title_order() {
        let title = MediaTitle {
            romaji: Some("Sousou no Frieren".into()),
            english: Some("Frieren: Beyond Journey's End".into()),
            user_preferred: None,
            native: None,
        };
        assert_eq!(title.preferred(), "Sousou no Frieren");

        let title = MediaTitle::default();
        assert_eq!(title.preferred(), "Unknown");
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::from_str::<MediaFormat>("\"TV_SHORT\"").unwrap(),
            MediaFormat::TvShort
        );
        assert_eq!(
            serde_json::from_str::<MediaStatus>("\"NOT_YET_RELEASED\"").unwrap(),
            MediaStatus::NotYetReleased
        );
        assert_eq!(
            serde_json::from_str::<RelationType>("\"SIDE_STORY\"").unwrap(),
            RelationType::SideStory
        );
        // Unknown wire values must not fail deserialization.
        assert_eq!(
            serde_json::from_str::<RelationType>("\"CHARACTER\"").unwrap(),
            RelationType::Other
        );
    }

    #[test]
    fn test_capability_checks() {
        let shallow = MediaNode {
            id: 1,
            ..Default::default()
        };
        assert!(!shallow.has_relations());
        assert!(!shallow.has_episode_count());
    }
}
