use super::{snippet, ImageSearch};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const UNSPLASH_SEARCH_API: &str = "https://api.unsplash.com/search/photos";

pub struct UnsplashClient {
    access_key: String,
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
    full: Option<String>,
}

impl UnsplashClient {
    pub fn new(client: Client, access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            client,
            endpoint: UNSPLASH_SEARCH_API.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    fn name(&self) -> &'static str {
        "unsplash"
    }

    async fn search(&self, term: &str) -> Result<Option<String>, ProviderError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .query(&[
                ("query", term),
                ("per_page", "1"),
                ("orientation", "landscape"),
            ])
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Unsplash HTTP {} for '{}'", status.as_u16(), term);
            return Err(ProviderError::Remote {
                provider: "unsplash",
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let parsed: SearchResponse = resp.json().await?;
        Ok(first_regular(parsed))
    }
}

// "regular" is Unsplash's large display size; "full" is the uncropped upload.
fn first_regular(resp: SearchResponse) -> Option<String> {
    let photo = resp.results.into_iter().next()?;
    photo.urls.regular.or(photo.urls.full)
}
