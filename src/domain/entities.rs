//! Entities mirrored from the backend's call surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::blob::BlobRef;
use super::time::Timestamp;

/// The introduction is a singleton stored under this id.
pub const INTRODUCTION_ID: &str = "intro";

/// Fresh id for a record created on this client.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Entities carrying at most one media attachment.
///
/// Upload code walks this slot to persist staged bytes before submission.
pub trait MediaEntity {
    fn media_mut(&mut self) -> &mut Option<BlobRef>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Introduction {
    pub id: String,
    pub name: String,
    pub title: String,
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<BlobRef>,
}

impl Introduction {
    pub fn new(name: impl Into<String>, title: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            id: INTRODUCTION_ID.to_string(),
            name: name.into(),
            title: title.into(),
            bio: bio.into(),
            profile_image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<BlobRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub publication_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<BlobRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<BlobRef>,
}

/// A visitor message. `salesforce_id` is filled in by an external sync only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salesforce_id: Option<String>,
}

impl ContactForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            email: email.into(),
            message: message.into(),
            timestamp: Timestamp::now(),
            salesforce_id: None,
        }
    }
}

/// Chatbot settings as any visitor may see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAiSettings {
    pub bot_name: String,
    pub initial_greeting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_image: Option<BlobRef>,
}

/// Chatbot settings including the integration secret. Admin only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub bot_name: String,
    pub initial_greeting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_image: Option<BlobRef>,
    pub salesforce_api_key: String,
}

impl AiSettings {
    pub fn public_view(&self) -> PublicAiSettings {
        PublicAiSettings {
            bot_name: self.bot_name.clone(),
            initial_greeting: self.initial_greeting.clone(),
            avatar_image: self.avatar_image.clone(),
        }
    }
}

impl fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSettings")
            .field("bot_name", &self.bot_name)
            .field("initial_greeting", &self.initial_greeting)
            .field("avatar_image", &self.avatar_image)
            .field("salesforce_api_key", &"<redacted>")
            .finish()
    }
}

/// The one chatbot settings record, as far as the caller is allowed to see it.
///
/// Both projections are cut from the same cached record so they cannot drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiSettingsRecord {
    Public(PublicAiSettings),
    Full(AiSettings),
}

impl AiSettingsRecord {
    pub fn public_view(&self) -> PublicAiSettings {
        match self {
            Self::Public(public) => public.clone(),
            Self::Full(full) => full.public_view(),
        }
    }

    pub fn full(&self) -> Option<&AiSettings> {
        match self {
            Self::Full(full) => Some(full),
            Self::Public(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsSettings {
    pub theme: String,
    pub layout_options: String,
    /// Section ids in display order.
    #[serde(default)]
    pub custom_section_order: Vec<String>,
}

/// Backend-maintained counters. The client never computes these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub total_blog_posts: u64,
    pub total_messages: u64,
    pub total_visits: u64,
    pub total_achievements: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Guest => "guest",
        }
    }
}

impl MediaEntity for Introduction {
    fn media_mut(&mut self) -> &mut Option<BlobRef> {
        &mut self.profile_image
    }
}

impl MediaEntity for Achievement {
    fn media_mut(&mut self) -> &mut Option<BlobRef> {
        &mut self.image
    }
}

impl MediaEntity for BlogPost {
    fn media_mut(&mut self) -> &mut Option<BlobRef> {
        &mut self.featured_image
    }
}

impl MediaEntity for ContentSection {
    fn media_mut(&mut self) -> &mut Option<BlobRef> {
        &mut self.image
    }
}

impl MediaEntity for AiSettings {
    fn media_mut(&mut self) -> &mut Option<BlobRef> {
        &mut self.avatar_image
    }
}
