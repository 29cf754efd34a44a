//! Uniform reference to user-uploaded media.
//!
//! A [`BlobRef`] is either a pointer to an object the backend already stores
//! ([`RemoteBlob`]) or bytes staged on the client that will be uploaded when
//! the owning entity is submitted ([`LocalBlob`]). Callers render both through
//! [`BlobRef::direct_url`] and read both through [`BlobRef::get_bytes`].

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Receives upload completion as a whole percentage in `0..=100`.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob not found at {url}")]
    NotFound { url: String },
    #[error("invalid blob url `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("failed to fetch blob: {0}")]
    Fetch(String),
    #[error("failed to read blob source: {0}")]
    Io(String),
}

/// Resolves the bytes behind a remote pointer.
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, BlobError>;
}

#[derive(Clone, PartialEq, Eq)]
pub enum BlobRef {
    Remote(RemoteBlob),
    Local(LocalBlob),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteBlob {
    url: Url,
}

impl RemoteBlob {
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(Clone)]
pub struct LocalBlob {
    bytes: Bytes,
    content_type: Option<String>,
    progress: Option<ProgressCallback>,
}

impl LocalBlob {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(FALLBACK_CONTENT_TYPE)
    }

    /// Reporter handed to whoever performs the upload of these bytes.
    ///
    /// Only upload code calls this, so a blob that is never submitted never
    /// reaches its callback.
    pub fn progress_reporter(&self) -> UploadProgress {
        UploadProgress {
            callback: self.progress.clone(),
            last: None,
        }
    }
}

impl PartialEq for LocalBlob {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes && self.content_type == other.content_type
    }
}

impl Eq for LocalBlob {}

impl fmt::Debug for LocalBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBlob")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type())
            .field("tracks_progress", &self.progress.is_some())
            .finish()
    }
}

impl fmt::Debug for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(remote) => f.debug_tuple("Remote").field(&remote.url.as_str()).finish(),
            Self::Local(local) => f.debug_tuple("Local").field(local).finish(),
        }
    }
}

impl BlobRef {
    /// Pointer to an object the backend already stores.
    pub fn from_url(input: &str) -> Result<Self, BlobError> {
        let url = Url::parse(input).map_err(|err| BlobError::InvalidUrl {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::Remote(RemoteBlob { url }))
    }

    /// Bytes staged locally, persisted when the owning entity is submitted.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Local(LocalBlob {
            bytes: bytes.into(),
            content_type: None,
            progress: None,
        })
    }

    /// Stage a file from disk, guessing its content type from the extension.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BlobError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| BlobError::Io(format!("{}: {err}", path.display())))?;
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self::Local(LocalBlob {
            bytes: Bytes::from(bytes),
            content_type,
            progress: None,
        }))
    }

    /// Set the content type used for previews and uploads. No effect on remote pointers.
    #[must_use]
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        match self {
            Self::Local(mut local) => {
                local.content_type = Some(content_type.into());
                Self::Local(local)
            }
            remote @ Self::Remote(_) => remote,
        }
    }

    /// Equivalent reference whose upload reports progress to `callback`.
    ///
    /// Remote pointers are already persisted and never upload, so they are
    /// returned unchanged.
    #[must_use]
    pub fn with_upload_progress<F>(self, callback: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        match self {
            Self::Local(mut local) => {
                local.progress = Some(Arc::new(callback));
                Self::Local(local)
            }
            remote @ Self::Remote(_) => remote,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn as_remote(&self) -> Option<&RemoteBlob> {
        match self {
            Self::Remote(remote) => Some(remote),
            Self::Local(_) => None,
        }
    }

    pub fn as_local(&self) -> Option<&LocalBlob> {
        match self {
            Self::Local(local) => Some(local),
            Self::Remote(_) => None,
        }
    }

    /// URL usable as an image source. Never suspends.
    ///
    /// Remote pointers return their URL unchanged. Local bytes are rendered as a
    /// transient `data:` URL for previews ahead of persistence.
    pub fn direct_url(&self) -> Cow<'_, str> {
        match self {
            Self::Remote(remote) => Cow::Borrowed(remote.url.as_str()),
            Self::Local(local) => Cow::Owned(format!(
                "data:{};base64,{}",
                local.content_type(),
                STANDARD.encode(&local.bytes)
            )),
        }
    }

    /// Raw content. Local bytes return immediately; remote pointers go through `fetcher`.
    pub async fn get_bytes(&self, fetcher: &dyn BlobFetcher) -> Result<Bytes, BlobError> {
        match self {
            Self::Local(local) => Ok(local.bytes.clone()),
            Self::Remote(remote) => fetcher.fetch(&remote.url).await,
        }
    }
}

impl From<Url> for BlobRef {
    fn from(url: Url) -> Self {
        Self::Remote(RemoteBlob { url })
    }
}

/// Monotonic progress reporter for a single upload.
///
/// Emits only strictly increasing percentages. Transfer progress tops out at
/// 99; 100 is emitted once, by [`UploadProgress::finish`], after the backend
/// has accepted both the upload and the entity that references it.
pub struct UploadProgress {
    callback: Option<ProgressCallback>,
    last: Option<u8>,
}

impl UploadProgress {
    /// Report `sent` of `total` bytes transferred.
    pub fn advance(&mut self, sent: u64, total: u64) {
        if total == 0 {
            return;
        }
        let scaled = u128::from(sent.min(total)) * 100 / u128::from(total);
        let percent = u8::try_from(scaled).unwrap_or(100).min(99);
        self.emit(percent);
    }

    /// Report successful completion.
    pub fn finish(&mut self) {
        self.emit(100);
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }

    fn emit(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        if let Some(callback) = &self.callback {
            callback(percent);
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BlobWire {
    url: Url,
}

/// Only persisted references travel on the wire as `{"url": ...}`.
/// Upload code replaces local bytes with the durable pointer before encoding.
impl Serialize for BlobRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Remote(remote) => BlobWire {
                url: remote.url.clone(),
            }
            .serialize(serializer),
            Self::Local(_) => Err(serde::ser::Error::custom(
                "local blob must be uploaded before it is serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for BlobRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = BlobWire::deserialize(deserializer)?;
        Ok(Self::from(wire.url))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingFetcher {
        calls: AtomicUsize,
        body: Option<Bytes>,
    }

    #[async_trait]
    impl BlobFetcher for CountingFetcher {
        async fn fetch(&self, url: &Url) -> Result<Bytes, BlobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone().ok_or_else(|| BlobError::NotFound {
                url: url.to_string(),
            })
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<u8>>>, impl Fn(u8) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |pct| sink.lock().expect("progress lock").push(pct))
    }

    #[tokio::test]
    async fn remote_direct_url_is_returned_without_fetching() {
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
            body: None,
        };
        let blob = BlobRef::from_url("https://cdn.example.com/a/b.png").expect("valid url");

        assert_eq!(blob.direct_url(), "https://cdn.example.com/a/b.png");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn local_bytes_resolve_without_fetcher() {
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
            body: None,
        };
        let blob = BlobRef::from_bytes(vec![1_u8, 2, 3]);

        let bytes = blob.get_bytes(&fetcher).await.expect("bytes");
        assert_eq!(&bytes[..], &[1, 2, 3]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_missing_object_is_not_found() {
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
            body: None,
        };
        let blob = BlobRef::from_url("https://cdn.example.com/gone.png").expect("valid url");

        let err = blob.get_bytes(&fetcher).await.expect_err("missing");
        assert!(matches!(err, BlobError::NotFound { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn local_preview_is_a_data_url() {
        let blob = BlobRef::from_bytes(b"hi".to_vec()).with_content_type("image/png");
        assert_eq!(blob.direct_url(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn unsubmitted_blob_never_reports_progress() {
        let (seen, callback) = recorder();
        let blob = BlobRef::from_bytes(vec![0_u8; 16]).with_upload_progress(callback);

        let _ = blob.direct_url();
        let _ = blob.clone();
        drop(blob);

        assert!(seen.lock().expect("progress lock").is_empty());
    }

    #[test]
    fn progress_is_strictly_increasing_and_ends_at_100() {
        let (seen, callback) = recorder();
        let blob = BlobRef::from_bytes(vec![0_u8; 300]).with_upload_progress(callback);
        let local = blob.as_local().expect("local");

        let mut progress = local.progress_reporter();
        progress.advance(0, 300);
        progress.advance(100, 300);
        progress.advance(100, 300);
        progress.advance(200, 300);
        progress.advance(300, 300);
        progress.finish();

        assert_eq!(*seen.lock().expect("progress lock"), vec![0, 33, 66, 99, 100]);
    }

    #[test]
    fn zero_byte_upload_reports_completion_once() {
        let (seen, callback) = recorder();
        let blob = BlobRef::from_bytes(Vec::<u8>::new()).with_upload_progress(callback);

        let mut progress = blob.as_local().expect("local").progress_reporter();
        progress.advance(0, 0);
        progress.finish();

        assert_eq!(*seen.lock().expect("progress lock"), vec![100]);
    }

    #[test]
    fn with_upload_progress_leaves_remote_untouched() {
        let blob = BlobRef::from_url("https://cdn.example.com/x.jpg")
            .expect("valid url")
            .with_upload_progress(|_| panic!("remote blobs never upload"));
        assert!(blob.is_remote());
    }

    #[test]
    fn empty_blob_is_still_a_blob() {
        let blob = BlobRef::from_bytes(Vec::<u8>::new());
        let local = blob.as_local().expect("local");
        assert!(local.is_empty());
        assert_eq!(local.content_type(), FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = BlobRef::from_url("not a url").expect_err("invalid");
        assert!(matches!(err, BlobError::InvalidUrl { .. }));
    }

    #[test]
    fn wire_form_is_url_object() {
        let blob = BlobRef::from_url("https://cdn.example.com/p.webp").expect("valid url");
        let json = serde_json::to_value(&blob).expect("serialize");
        assert_eq!(json, serde_json::json!({ "url": "https://cdn.example.com/p.webp" }));

        let back: BlobRef = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, blob);
    }

    #[test]
    fn local_blob_refuses_to_serialize() {
        let blob = BlobRef::from_bytes(vec![1_u8]);
        assert!(serde_json::to_value(&blob).is_err());
    }

    #[tokio::test]
    async fn from_file_guesses_content_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("avatar.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).expect("write");

        let blob = BlobRef::from_file(&path).await.expect("load");
        let local = blob.as_local().expect("local");
        assert_eq!(local.content_type(), "image/png");
        assert_eq!(local.len(), 4);
    }
}
