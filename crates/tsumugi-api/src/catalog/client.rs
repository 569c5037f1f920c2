use std::fmt::Write as _;

use reqwest::Client;

use tsumugi_core::error::SourceError;
use tsumugi_core::models::MediaNode;
use tsumugi_core::source::CatalogSource;

use super::error::CatalogError;
use super::types::{BatchResponse, CatalogMedia, GraphQLResponse, MediaResponse, PageResponse};

const API_URL: &str = "https://graphql.anilist.co";

/// Ids per batched request. The catalog rejects overly wide queries, so
/// larger requests are split into chunks of this size.
const BATCH_CHUNK: usize = 10;

const MEDIA_FIELDS: &str = r#"
id
idMal
title { romaji english userPreferred native }
synonyms
episodes
format
season
status
nextAiringEpisode { episode airingAt }
relations {
    edges {
        relationType
        node {
            id
            idMal
            title { romaji english userPreferred native }
            synonyms
            episodes
            format
            season
            status
        }
    }
}
"#;

const GET_MEDIA_QUERY: &str = r#"
query ($id: Int) {
    Media(id: $id, type: ANIME) {
        %FIELDS%
    }
}
"#;

const SEARCH_MEDIA_QUERY: &str = r#"
query ($search: String) {
    Page(perPage: 10) {
        media(search: $search, type: ANIME) {
            %FIELDS%
        }
    }
}
"#;

/// Media catalog GraphQL client.
pub struct CatalogClient {
    http: Client,
    api_url: String,
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient {
    pub fn new() -> Self {
        Self::with_url(API_URL)
    }

    /// Point the client at a different endpoint (tests, mirrors).
    pub fn with_url(api_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into(),
        }
    }

    async fn graphql_request<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, CatalogError> {
        tracing::debug!(operation, "Catalog GraphQL request");

        let resp = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "query": query,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status_code, "Catalog API error");
            return Err(CatalogError::Api {
                status: status_code,
                message: body,
            });
        }

        tracing::debug!(operation, status = %status, "Catalog response received");
        resp.json::<T>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Fetch one media with its relation edges.
    pub async fn get_media(&self, id: u64) -> Result<MediaNode, CatalogError> {
        let query = GET_MEDIA_QUERY.replace("%FIELDS%", MEDIA_FIELDS);
        let resp: GraphQLResponse<MediaResponse> = self
            .graphql_request("GetMedia", &query, serde_json::json!({ "id": id }))
            .await?;

        resp.data
            .media
            .map(CatalogMedia::into_media)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Keyword search against the catalog, first page of results.
    pub async fn search_media(&self, keyword: &str) -> Result<Vec<MediaNode>, CatalogError> {
        let query = SEARCH_MEDIA_QUERY.replace("%FIELDS%", MEDIA_FIELDS);
        let resp: GraphQLResponse<PageResponse> = self
            .graphql_request(
                "SearchMedia",
                &query,
                serde_json::json!({ "search": keyword }),
            )
            .await?;
        Ok(resp
            .data
            .page
            .media
            .into_iter()
            .map(CatalogMedia::into_media)
            .collect())
    }

    /// Fetch several media, batching ids into aliased sub-queries.
    ///
    /// Unknown ids are dropped from the result rather than failing the
    /// whole batch.
    pub async fn get_media_batch(&self, ids: &[u64]) -> Result<Vec<MediaNode>, CatalogError> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_CHUNK) {
            let query = build_batch_query(chunk);
            let resp: GraphQLResponse<BatchResponse> = self
                .graphql_request("GetMediaBatch", &query, serde_json::json!({}))
                .await?;

            // Keep the caller's id order within the chunk.
            for (i, &id) in chunk.iter().enumerate() {
                match resp.data.get(&format!("m{i}")).and_then(Clone::clone) {
                    Some(media) => out.push(media.into_media()),
                    None => tracing::debug!(media_id = id, "Batched media not found"),
                }
            }
        }
        Ok(out)
    }
}

/// One aliased sub-query per id: `m0: Media(id: …, type: ANIME) { … }`.
fn build_batch_query(ids: &[u64]) -> String {
    let mut query = String::from("query {\n");
    for (i, id) in ids.iter().enumerate() {
        let _ = write!(
            query,
            "m{i}: Media(id: {id}, type: ANIME) {{ {MEDIA_FIELDS} }}\n"
        );
    }
    query.push('}');
    query
}

impl CatalogSource for CatalogClient {
    async fn fetch_media(&self, id: u64) -> Result<MediaNode, SourceError> {
        self.get_media(id).await.map_err(SourceError::from)
    }

    async fn fetch_media_batch(&self, ids: &[u64]) -> Result<Vec<MediaNode>, SourceError> {
        self.get_media_batch(ids).await.map_err(SourceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_query_aliases_each_id() {
        let query = build_batch_query(&[101922, 112151, 5]);
        assert!(query.starts_with("query {"));
        assert!(query.contains("m0: Media(id: 101922, type: ANIME)"));
        assert!(query.contains("m1: Media(id: 112151, type: ANIME)"));
        assert!(query.contains("m2: Media(id: 5, type: ANIME)"));
        assert!(query.contains("relationType"));
        assert!(query.trim_end().ends_with('}'));
    }

    #[test]
    fn test_single_media_query_requests_relations() {
        let query = GET_MEDIA_QUERY.replace("%FIELDS%", MEDIA_FIELDS);
        assert!(query.contains("Media(id: $id, type: ANIME)"));
        assert!(query.contains("nextAiringEpisode { episode airingAt }"));
        assert!(query.contains("relations {"));
    }
}
