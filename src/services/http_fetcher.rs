//! reqwest-backed HTTP fetch service.

use crate::core::QueryContext;
use crate::error::{Error, Result};
use crate::services::{ByteStream, HttpFetcher};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Plain GET fetcher on top of a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher; without `timeout` a hung request blocks indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("smartkg/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, uri: &str, _context: &QueryContext) -> Result<ByteStream> {
        debug!("GET {}", uri);
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| Error::Fetch { uri: uri.to_string(), reason: e.to_string() })?;

        if !response.status().is_success() {
            return Err(Error::Fetch {
                uri: uri.to_string(),
                reason: format!("request failed with status {}", response.status()),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        assert!(ReqwestFetcher::new(None).is_ok());
        assert!(ReqwestFetcher::new(Some(Duration::from_secs(30))).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_uri_is_fetch_error() {
        let fetcher = ReqwestFetcher::new(None).unwrap();
        let result = fetcher.fetch("not a uri", &QueryContext::new()).await;
        assert!(matches!(result, Err(Error::Fetch { .. })));
    }
}
