// FILE: src/engine/favicon.rs
use async_trait::async_trait;
use std::time::Duration;
use crate::error::{Result, IndexError};

/// Fetches the raw bytes of an icon. Callers decide what a failure means.
#[async_trait]
pub trait IconFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// `<domain>/favicon.ico`
pub fn favicon_url(domain: &str) -> String {
    format!("{}/favicon.ico", domain)
}

pub struct HttpIconFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpIconFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, max_bytes))
    }

    pub fn with_client(client: reqwest::Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }
}

#[async_trait]
impl IconFetcher for HttpIconFetcher {
    /// Bodies larger than `max_bytes` are rejected, declared or not.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(IndexError::Other(anyhow::anyhow!("HTTP {} for {}", response.status(), url)));
        }
        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes as u64 {
                return Err(IndexError::Other(anyhow::anyhow!(
                    "Icon at {} is {} bytes (limit {})", url, declared, self.max_bytes
                )));
            }
        }

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if data.len() + chunk.len() > self.max_bytes {
                return Err(IndexError::Other(anyhow::anyhow!(
                    "Icon at {} exceeds {} bytes", url, self.max_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}

/// Never reaches the network; every record gets the default icon.
pub struct OfflineIconFetcher;

#[async_trait]
impl IconFetcher for OfflineIconFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Err(IndexError::Other(anyhow::anyhow!("Icon fetching disabled ({})", url)))
    }
}
