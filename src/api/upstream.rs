//! Upstream REST backend client used by the `/api` read-through route.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;

/// JSON-over-HTTP backend whose GET responses are served through the cache.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
    /// TTL applied to cached responses
    pub ttl: Option<Duration>,
}

impl Upstream {
    pub fn new(base_url: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl,
        }
    }

    /// URL for a path relative to the backend root.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builds a fetch of `path` that owns everything it needs, so it can be
    /// queued and run later.
    pub fn fetch(&self, path: &str) -> impl Future<Output = anyhow::Result<Value>> + Send + 'static {
        let client = self.client.clone();
        let url = self.url(path);

        async move {
            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?
                .error_for_status()?;
            let body = response
                .json::<Value>()
                .await
                .with_context(|| format!("decoding body of {url}"))?;
            Ok(body)
        }
    }
}
