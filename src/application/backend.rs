//! Backend call surface.
//!
//! Every remote operation the site performs. Implementations are bound to one
//! identity; the gateway replaces the whole handle when the identity changes.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Achievement, AiSettings, BlogPost, CmsSettings, ContactForm, ContentSection, Introduction,
    PublicAiSettings, SiteStats, UserRole,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("caller is not authorized")]
    Unauthorized,
    #[error("backend rejected the call: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Authenticated handle to the backend. Writes return success or failure only.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_introduction(&self) -> BackendResult<Introduction>;
    async fn update_introduction(&self, intro: Introduction) -> BackendResult<()>;

    async fn get_achievements(&self) -> BackendResult<Vec<Achievement>>;
    async fn add_achievement(&self, achievement: Achievement) -> BackendResult<()>;
    async fn update_achievement(&self, achievement: Achievement) -> BackendResult<()>;
    async fn delete_achievement(&self, id: &str) -> BackendResult<()>;

    async fn get_blog_posts(&self) -> BackendResult<Vec<BlogPost>>;
    async fn add_blog_post(&self, post: BlogPost) -> BackendResult<()>;
    async fn update_blog_post(&self, post: BlogPost) -> BackendResult<()>;
    async fn delete_blog_post(&self, id: &str) -> BackendResult<()>;

    async fn get_content_sections(&self) -> BackendResult<Vec<ContentSection>>;
    async fn add_content_section(&self, section: ContentSection) -> BackendResult<()>;
    async fn update_content_section(&self, section: ContentSection) -> BackendResult<()>;
    async fn delete_content_section(&self, id: &str) -> BackendResult<()>;

    async fn get_contact_forms(&self) -> BackendResult<Vec<ContactForm>>;
    async fn submit_contact_form(&self, form: ContactForm) -> BackendResult<()>;

    async fn get_cms_settings(&self) -> BackendResult<CmsSettings>;
    async fn update_cms_settings(&self, settings: CmsSettings) -> BackendResult<()>;

    async fn get_ai_settings(&self) -> BackendResult<PublicAiSettings>;
    /// Privileged view including the integration secret.
    async fn get_full_ai_settings(&self) -> BackendResult<AiSettings>;
    async fn update_ai_settings(&self, settings: AiSettings) -> BackendResult<()>;

    async fn get_site_stats(&self) -> BackendResult<SiteStats>;
    async fn update_site_stats(&self, stats: SiteStats) -> BackendResult<()>;

    async fn is_caller_admin(&self) -> BackendResult<bool>;
    async fn get_caller_user_role(&self) -> BackendResult<UserRole>;
    async fn assign_caller_user_role(&self, principal: &str, role: UserRole) -> BackendResult<()>;
}
