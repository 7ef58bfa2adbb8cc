use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::models::*;

/// Source of remote binary assets (technology images, record files).
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Downloads `url`; a non-success status is an error.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout_ms: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_millis(timeout_ms.min(10_000)))
            .user_agent(user_agent)
            .build()
            .map_err(|e| IngestionError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.http_timeout_ms, &config.http_user_agent)
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url = %url, "Downloading asset");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestionError::Asset(format!(
                "HTTP error downloading {}: {} {}",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
