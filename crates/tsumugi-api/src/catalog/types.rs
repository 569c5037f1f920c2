//! Wire types for the catalog's GraphQL responses.
//!
//! The catalog nests relation edges inside a connection object; these
//! types mirror that shape and flatten into the engine's `MediaNode`.

use std::collections::HashMap;

use serde::Deserialize;

use tsumugi_core::models::{
    Edge, MediaFormat, MediaNode, MediaSeason, MediaStatus, MediaTitle, NextAiringEpisode,
    RelationType,
};

#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct MediaResponse {
    #[serde(rename = "Media")]
    pub media: Option<CatalogMedia>,
}

/// A batched response: one aliased entry per requested id. Unknown ids
/// come back as explicit nulls.
pub type BatchResponse = HashMap<String, Option<CatalogMedia>>;

#[derive(Debug, Deserialize)]
pub struct PageResponse {
    #[serde(rename = "Page")]
    pub page: Page,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub media: Vec<CatalogMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMedia {
    pub id: u64,
    #[serde(rename = "idMal")]
    pub id_mal: Option<u64>,
    #[serde(default)]
    pub title: MediaTitle,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub episodes: Option<u32>,
    pub format: Option<MediaFormat>,
    pub season: Option<MediaSeason>,
    pub status: Option<MediaStatus>,
    #[serde(rename = "nextAiringEpisode")]
    pub next_airing_episode: Option<NextAiringEpisode>,
    pub relations: Option<RelationConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationConnection {
    #[serde(default)]
    pub edges: Vec<RelationEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationEdge {
    #[serde(rename = "relationType")]
    pub relation_type: RelationType,
    pub node: Box<CatalogMedia>,
}

impl CatalogMedia {
    /// Flatten into the engine's media node, relation connection and
    /// all.
    pub fn into_media(self) -> MediaNode {
        MediaNode {
            id: self.id,
            id_mal: self.id_mal,
            title: self.title,
            synonyms: self.synonyms,
            episodes: self.episodes,
            format: self.format,
            season: self.season,
            status: self.status,
            next_airing_episode: self.next_airing_episode,
            relations: self
                .relations
                .map(|conn| {
                    conn.edges
                        .into_iter()
                        .map(|edge| Edge {
                            relation_type: edge.relation_type,
                            node: edge.node.into_media(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_media_with_relations() {
        let json = r#"{
            "data": {
                "Media": {
                    "id": 101922,
                    "idMal": 38000,
                    "title": { "romaji": "Kimetsu no Yaiba", "english": "Demon Slayer" },
                    "synonyms": ["KnY"],
                    "episodes": 26,
                    "format": "TV",
                    "season": "SPRING",
                    "status": "FINISHED",
                    "nextAiringEpisode": null,
                    "relations": {
                        "edges": [
                            {
                                "relationType": "SEQUEL",
                                "node": {
                                    "id": 112151,
                                    "idMal": null,
                                    "title": { "romaji": "Mugen Ressha-hen" },
                                    "episodes": null,
                                    "format": "MOVIE",
                                    "season": null,
                                    "status": "FINISHED",
                                    "relations": null
                                }
                            }
                        ]
                    }
                }
            }
        }"#;

        let resp: GraphQLResponse<MediaResponse> = serde_json::from_str(json).unwrap();
        let media = resp.data.media.unwrap().into_media();
        assert_eq!(media.id, 101922);
        assert_eq!(media.episodes, Some(26));
        assert_eq!(media.relations.len(), 1);
        assert_eq!(media.relations[0].relation_type, RelationType::Sequel);
        assert_eq!(media.relations[0].node.id, 112151);
        assert_eq!(media.relations[0].node.format, Some(MediaFormat::Movie));
    }

    #[test]
    fn test_batch_response_with_null_alias() {
        let json = r#"{
            "data": {
                "m0": { "id": 1, "title": { "romaji": "A" }, "relations": null },
                "m1": null
            }
        }"#;

        let resp: GraphQLResponse<BatchResponse> = serde_json::from_str(json).unwrap();
        assert!(resp.data.get("m0").unwrap().is_some());
        assert!(resp.data.get("m1").unwrap().is_none());
    }

    #[test]
    fn test_unrecognized_format_degrades() {
        let json = r#"{ "id": 5, "format": "HOLOGRAM", "relations": null }"#;
        let media: CatalogMedia = serde_json::from_str(json).unwrap();
        assert_eq!(media.format, Some(MediaFormat::Unknown));
    }
}
