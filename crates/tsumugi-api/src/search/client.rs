use reqwest::Client;
use url::Url;

use tsumugi_core::error::SourceError;
use tsumugi_core::source::{TitleCandidate, TitleSearchSource};

use super::error::SearchError;
use super::types::{SearchHit, SearchResponse};

/// Title-search REST client.
///
/// The provider ranks its own results; candidates come back best-first
/// and the engine applies its confidence floor on top.
pub struct SearchClient {
    http: Client,
    base_url: Url,
}

impl SearchClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Search the provider for a parsed title.
    pub async fn search(&self, keyword: &str) -> Result<Vec<TitleCandidate>, SearchError> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| SearchError::Parse(e.to_string()))?;
        url.query_pairs_mut().append_pair("keyword", keyword);

        tracing::debug!(keyword, "Title search request");
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(keyword, status = status_code, "Search API error");
            return Err(SearchError::Api {
                status: status_code,
                message: body,
            });
        }

        let parsed = resp
            .json::<SearchResponse>()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .map(SearchHit::into_candidate)
            .collect())
    }
}

impl TitleSearchSource for SearchClient {
    async fn search_title(&self, keyword: &str) -> Result<Vec<TitleCandidate>, SourceError> {
        self.search(keyword).await.map_err(SourceError::from)
    }
}
