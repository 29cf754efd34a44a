//! Infrastructure adapters and runtime bootstrap.

pub mod backend;
pub mod blobs;
pub mod client;
pub mod error;
pub mod telemetry;
pub mod uploads;

pub use backend::{HttpBackend, HttpConnector};
pub use blobs::HttpBlobFetcher;
pub use client::ApiClient;
pub use uploads::{BlobUploader, PersistedMedia};
