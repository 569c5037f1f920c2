use reqwest::Client;
use url::Url;

use tsumugi_core::error::SourceError;
use tsumugi_core::models::{EpisodeMapping, MappingKey};
use tsumugi_core::source::MappingSource;

use super::error::MappingError;

const API_URL: &str = "https://api.ani.zip";

/// Episode-mapping REST client.
pub struct MappingClient {
    http: Client,
    base_url: Url,
}

impl Default for MappingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingClient {
    pub fn new() -> Self {
        let base = Url::parse(API_URL).expect("default mapping URL is valid");
        Self::with_url(base)
    }

    pub fn with_url(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    fn mappings_url(&self, key: MappingKey) -> Result<Url, MappingError> {
        let mut url = self
            .base_url
            .join("mappings")
            .map_err(|e| MappingError::Parse(e.to_string()))?;
        let (param, id) = match key {
            MappingKey::Anilist(id) => ("anilist_id", id),
            MappingKey::Mal(id) => ("mal_id", id),
        };
        url.query_pairs_mut().append_pair(param, &id.to_string());
        Ok(url)
    }

    /// Fetch the episode mapping for a media.
    pub async fn get_mapping(&self, key: MappingKey) -> Result<EpisodeMapping, MappingError> {
        let url = self.mappings_url(key)?;
        tracing::debug!(key = %key, "Mapping request");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(MappingError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(key = %key, status = status_code, "Mapping API error");
            return Err(MappingError::Api {
                status: status_code,
                message: body,
            });
        }

        resp.json::<EpisodeMapping>()
            .await
            .map_err(|e| MappingError::Parse(e.to_string()))
    }
}

impl MappingSource for MappingClient {
    async fn fetch_mapping(&self, key: MappingKey) -> Result<EpisodeMapping, SourceError> {
        self.get_mapping(key).await.map_err(SourceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mappings_url_by_key_kind() {
        let client = MappingClient::new();
        let url = client.mappings_url(MappingKey::Anilist(101922)).unwrap();
        assert_eq!(url.as_str(), "https://api.ani.zip/mappings?anilist_id=101922");

        let url = client.mappings_url(MappingKey::Mal(38000)).unwrap();
        assert_eq!(url.as_str(), "https://api.ani.zip/mappings?mal_id=38000");
    }
}
