use super::{snippet, ImageSearch};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const PEXELS_SEARCH_API: &str = "https://api.pexels.com/v1/search";

pub struct PexelsClient {
    api_key: String,
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    large: Option<String>,
}

impl PexelsClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client,
            endpoint: PEXELS_SEARCH_API.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ImageSearch for PexelsClient {
    fn name(&self) -> &'static str {
        "pexels"
    }

    async fn search(&self, term: &str) -> Result<Option<String>, ProviderError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("Authorization", &self.api_key)
            .query(&[("query", term), ("per_page", "1")])
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Pexels HTTP {} for '{}'", status.as_u16(), term);
            return Err(ProviderError::Remote {
                provider: "pexels",
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let parsed: SearchResponse = resp.json().await?;
        Ok(first_large(parsed))
    }
}

fn first_large(resp: SearchResponse) -> Option<String> {
    resp.photos.into_iter().next().and_then(|p| p.src.large)
}
