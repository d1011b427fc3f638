//! Published library manifest over HTTP

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::RemoteLibrarySource;
use crate::error::{GalleryError, Result};
use crate::library::ManifestSet;

/// Fetches the published manifest set from a fixed URL
pub struct HttpRemoteSource {
    client: reqwest::Client,
    url: String,
}

impl HttpRemoteSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("prompt-gallery/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GalleryError::transport("creating HTTP client", e))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteLibrarySource for HttpRemoteSource {
    async fn remote_libraries(&self) -> Result<ManifestSet> {
        let action = format!("fetching remote libraries from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| GalleryError::transport(action.clone(), e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GalleryError::not_found(self.url.clone()));
        }

        if !response.status().is_success() {
            return Err(GalleryError::transport(
                action,
                format!("HTTP {}", response.status()),
            ));
        }

        let content = response
            .text()
            .await
            .map_err(|e| GalleryError::transport("reading response body", e))?;

        debug!("Fetched remote libraries ({} bytes)", content.len());
        ManifestSet::from_json(&content)
    }

    fn name(&self) -> &str {
        &self.url
    }
}
