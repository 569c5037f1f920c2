use serde::Deserialize;

use tsumugi_core::source::TitleCandidate;

/// One hit from the title-search provider, best-first in the response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "anilistId")]
    pub anilist_id: Option<u64>,
    pub title: String,
    /// Provider confidence in [0, 1].
    pub confidence: f64,
}

impl SearchHit {
    pub fn into_candidate(self) -> TitleCandidate {
        TitleCandidate {
            media_id: self.anilist_id,
            title: self.title,
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_search_response() {
        let json = r#"{
            "results": [
                { "anilistId": 101922, "title": "Kimetsu no Yaiba", "confidence": 0.97 },
                { "anilistId": null, "title": "Unmapped Show", "confidence": 0.42 }
            ]
        }"#;

        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.results.len(), 2);

        let first = resp.results[0].clone().into_candidate();
        assert_eq!(first.media_id, Some(101922));
        assert_eq!(first.confidence, 0.97);

        let second = resp.results[1].clone().into_candidate();
        assert_eq!(second.media_id, None);
    }
}
