use super::snippet;
use crate::error::RenderError;
use crate::render::{RenderApi, RenderJob, VideoRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

const STATUS_PAGE_BASE: &str = "https://app.synthesia.io/video";

pub struct SynthesiaClient {
    api_key: String,
    api_base: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CreatedVideo {
    id: String,
}

impl SynthesiaClient {
    pub fn new(client: Client, api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn videos_url(&self) -> String {
        format!("{}/v2/videos", self.api_base)
    }
}

async fn remote_error(resp: reqwest::Response) -> RenderError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    warn!("Synthesia HTTP {}", status);
    if !body.is_empty() {
        warn!("Synthesia raw body: {}", snippet(&body));
    }
    RenderError::Remote {
        status,
        body: snippet(&body),
    }
}

#[async_trait]
impl RenderApi for SynthesiaClient {
    fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn create_video(&self, request: &VideoRequest) -> Result<String, RenderError> {
        let resp = self
            .client
            .post(self.videos_url())
            .header("Authorization", &self.api_key)
            .header("Accept", "application/json")
            .json(request)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(remote_error(resp).await);
        }

        let created: CreatedVideo = resp.json().await?;
        Ok(created.id)
    }

    async fn video_status(&self, job_id: &str) -> Result<RenderJob, RenderError> {
        let resp = self
            .client
            .get(format!("{}/{}", self.videos_url(), job_id))
            .header("Authorization", &self.api_key)
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(remote_error(resp).await);
        }

        let raw = resp.text().await?;
        debug!("Synthesia status response: {}", snippet(&raw));
        Ok(serde_json::from_str(&raw)?)
    }

    async fn download_into(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, RenderError> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RenderError::Download(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RenderError::Download(format!(
                "HTTP {}",
                resp.status().as_u16()
            )));
        }

        let mut written = 0u64;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| RenderError::Download(e.to_string()))?
        {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }

    fn status_page(&self, job_id: &str) -> String {
        format!("{STATUS_PAGE_BASE}/{job_id}")
    }
}
