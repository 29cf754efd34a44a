//! Remote blob byte fetch.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::domain::{BlobError, BlobFetcher};

/// Fetches blob bytes by URL. Blob URLs are public, so no credential is sent.
#[derive(Clone, Debug, Default)]
pub struct HttpBlobFetcher {
    client: Client,
}

impl HttpBlobFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobFetcher for HttpBlobFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, BlobError> {
        debug!(url = %url, "Fetching blob");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| BlobError::Fetch(err.to_string()))?;

        match resp.status() {
            status if status.is_success() => resp
                .bytes()
                .await
                .map_err(|err| BlobError::Fetch(err.to_string())),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(BlobError::NotFound {
                url: url.to_string(),
            }),
            status => Err(BlobError::Fetch(format!("status {status} for {url}"))),
        }
    }
}
