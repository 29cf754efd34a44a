//! Chunked blob upload.
//!
//! Staged bytes are sent in fixed-size chunks and committed once all chunks
//! are accepted. The commit answers with the durable URL that replaces the
//! local bytes in the entity payload. Completion (100) is reported only once
//! the entity carrying that URL has been written.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::{BackendError, BackendResult};
use crate::domain::{BlobRef, LocalBlob, MediaEntity, UploadProgress};

use super::client::ApiClient;

/// Chunk size used when settings don't override it.
pub const DEFAULT_CHUNK_BYTES: usize = 256 * 1024;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BeginUpload<'a> {
    content_type: &'a str,
    size: u64,
}

#[derive(Deserialize)]
struct UploadSession {
    id: String,
}

#[derive(Deserialize)]
struct CommittedUpload {
    url: String,
}

/// Upload whose final progress report waits on the entity write.
#[must_use = "call `confirm` once the entity write succeeds"]
pub struct PersistedMedia {
    progress: Option<UploadProgress>,
}

impl PersistedMedia {
    fn untouched() -> Self {
        Self { progress: None }
    }

    /// Report 100 to the blob's progress callback.
    pub fn confirm(self) {
        if let Some(mut progress) = self.progress {
            progress.finish();
        }
    }
}

#[derive(Clone, Debug)]
pub struct BlobUploader {
    api: ApiClient,
    chunk_bytes: usize,
}

impl BlobUploader {
    pub fn new(api: ApiClient, chunk_bytes: usize) -> Self {
        Self {
            api,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    /// Upload `blob` and return the remote pointer the backend assigned.
    ///
    /// Progress is reported to the blob's callback as chunks are accepted and
    /// stops at 99; the returned reporter emits 100 when finished.
    pub async fn upload(&self, blob: &LocalBlob) -> BackendResult<(BlobRef, UploadProgress)> {
        let total = blob.len() as u64;
        let mut progress = blob.progress_reporter();

        let session: UploadSession = self
            .api
            .post_json_for(
                &["api", "blobs"],
                &BeginUpload {
                    content_type: blob.content_type(),
                    size: total,
                },
            )
            .await?;
        progress.advance(0, total);

        let mut sent = 0_u64;
        for (index, chunk) in blob.bytes().chunks(self.chunk_bytes).enumerate() {
            let index = index.to_string();
            let part = Part::bytes(chunk.to_vec())
                .file_name(format!("chunk-{index}"))
                .mime_str(blob.content_type())
                .map_err(BackendError::transport)?;
            let segments = ["api", "blobs", session.id.as_str(), "chunks", index.as_str()];
            let resp = self
                .api
                .request(Method::PUT, &segments)?
                .multipart(Form::new().part("chunk", part))
                .send()
                .await
                .map_err(BackendError::transport)?;
            ApiClient::check(resp, &segments).await?;

            sent += chunk.len() as u64;
            progress.advance(sent, total);
            debug!(upload = %session.id, chunk = %index, sent, total, "Upload chunk accepted");
        }

        let committed: CommittedUpload = self
            .api
            .post_json_for(&["api", "blobs", session.id.as_str(), "commit"], &())
            .await?;
        let remote = BlobRef::from_url(&committed.url)
            .map_err(|err| BackendError::Rejected(err.to_string()))?;

        info!(upload = %session.id, bytes = total, "Upload committed");
        Ok((remote, progress))
    }

    /// Replace staged bytes in `entity` with their durable pointer.
    pub async fn persist_media<E: MediaEntity + Send>(
        &self,
        entity: &mut E,
    ) -> BackendResult<PersistedMedia> {
        let media = entity.media_mut();
        let (remote, progress) = match media.as_ref() {
            Some(BlobRef::Local(local)) => self.upload(local).await?,
            Some(BlobRef::Remote(_)) | None => return Ok(PersistedMedia::untouched()),
        };
        *media = Some(remote);
        Ok(PersistedMedia {
            progress: Some(progress),
        })
    }
}
