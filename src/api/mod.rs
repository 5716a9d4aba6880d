//! Clients for the external providers and the traits the pipeline sees
//! them through.

use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub mod openai;
pub mod pexels;
pub mod probe;
pub mod synthesia;
pub mod unsplash;

/// Longest response body echoed into logs and errors.
pub(crate) const BODY_SNIPPET_CHARS: usize = 800;

pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Shared HTTP client. There is no total deadline: downloads may take as
/// long as they keep receiving data, and a stall longer than
/// `read_timeout` aborts them. API calls set their own per-request limits.
pub fn http_client(read_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .read_timeout(read_timeout)
        .build()
}

/// Black-box text generator returning the raw model output for a
/// training request.
#[async_trait]
pub trait ScriptProposer: Send + Sync {
    async fn propose(&self, request: &str) -> Result<String, ProviderError>;
}

/// An image search provider. Returns the first result's image URL.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, term: &str) -> Result<Option<String>, ProviderError>;
}

/// Network liveness check for image URLs. Never fails; any problem
/// means "not live".
#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn is_live(&self, url: &str) -> bool;
}
