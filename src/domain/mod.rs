//! Wire entities and value types shared by the cache, the gateway and the UI.

pub mod blob;
pub mod entities;
pub mod error;
pub mod time;

pub use blob::{BlobError, BlobFetcher, BlobRef, LocalBlob, RemoteBlob, UploadProgress};
pub use entities::{
    Achievement, AiSettings, AiSettingsRecord, BlogPost, CmsSettings, ContactForm, ContentSection,
    INTRODUCTION_ID, Introduction, MediaEntity, PublicAiSettings, SiteStats, UserRole,
    new_record_id,
};
pub use error::DomainError;
pub use time::{NANOS_PER_MILLI, Timestamp};
