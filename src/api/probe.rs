use super::LinkProbe;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

/// HEAD-request liveness probe.
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// A URL is probe-worthy only with both a scheme and a host.
pub fn is_absolute_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

#[async_trait]
impl LinkProbe for HttpProbe {
    async fn is_live(&self, url: &str) -> bool {
        if !is_absolute_url(url) {
            return false;
        }

        match self.client.head(url).timeout(self.timeout).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                if !ok {
                    debug!("probe {url}: HTTP {}", resp.status().as_u16());
                }
                ok
            }
            Err(err) => {
                debug!("probe {url}: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_need_scheme_and_host() {
        assert!(is_absolute_url("https://images.pexels.com/photos/1.jpeg"));
        assert!(!is_absolute_url("neural network"));
        assert!(!is_absolute_url("/photos/1.jpeg"));
        assert!(!is_absolute_url("mailto:someone@example.com"));
    }

    #[tokio::test]
    async fn non_url_is_never_probed() {
        let probe = HttpProbe::new(Client::new(), Duration::from_millis(10));
        assert!(!probe.is_live("artificial intelligence").await);
    }
}
