//! Request-by-path helper for the companion server's HTTP endpoints.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::FetchResult;
use tracing::debug;

#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn get(&self, path: &str) -> Result<FetchResult>;
}

pub struct HttpComm {
    http: Client,
    base_url: String,
}

impl HttpComm {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RemoteFetch for HttpComm {
    async fn get(&self, path: &str) -> Result<FetchResult> {
        let url = self.endpoint(path);
        debug!(%url, "fetching");
        let result = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()?
            .json::<FetchResult>()
            .await
            .with_context(|| format!("invalid response body from {url}"))?;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/comm_tests.rs"]
mod tests;
