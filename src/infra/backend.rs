//! reqwest-backed implementation of the backend call surface.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::{Backend, BackendError, BackendResult, Connector, Identity};
use crate::config::BackendSettings;
use crate::domain::{
    Achievement, AiSettings, BlogPost, CmsSettings, ContactForm, ContentSection, Introduction,
    PublicAiSettings, SiteStats, UserRole,
};

use super::client::ApiClient;
use super::uploads::BlobUploader;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    #[serde(default)]
    principal: Option<String>,
}

#[derive(Serialize)]
struct RoleAssignment<'a> {
    principal: &'a str,
    role: UserRole,
}

/// Opens an [`HttpBackend`] per identity, sharing one connection pool.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    api: ApiClient,
    chunk_bytes: usize,
}

impl HttpConnector {
    pub fn new(base: Url, settings: &BackendSettings) -> BackendResult<Self> {
        let client = ApiClient::build_http(settings)?;
        Ok(Self {
            api: ApiClient::new(client, base, None),
            chunk_bytes: settings.upload_chunk_bytes,
        })
    }

    pub fn from_settings(settings: &BackendSettings) -> BackendResult<Self> {
        let base = settings
            .base_url
            .clone()
            .ok_or_else(|| BackendError::Transport("backend.base_url is not configured".into()))?;
        Self::new(base, settings)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    /// Confirms the credential against the session endpoint before handing out a backend.
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn Backend>, BackendError> {
        let api = self.api.with_token(identity.token().map(str::to_string));
        let session: SessionInfo = api.get_json(&["api", "session"]).await?;
        info!(
            principal = session.principal.as_deref().unwrap_or("anonymous"),
            "Backend session established"
        );
        Ok(Arc::new(HttpBackend::new(api, self.chunk_bytes)))
    }
}

#[derive(Clone, Debug)]
pub struct HttpBackend {
    api: ApiClient,
    uploader: BlobUploader,
}

impl HttpBackend {
    pub fn new(api: ApiClient, chunk_bytes: usize) -> Self {
        Self {
            uploader: BlobUploader::new(api.clone(), chunk_bytes),
            api,
        }
    }

    pub fn uploader(&self) -> &BlobUploader {
        &self.uploader
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_introduction(&self) -> BackendResult<Introduction> {
        self.api.get_json(&["api", "introduction"]).await
    }

    async fn update_introduction(&self, mut intro: Introduction) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut intro).await?;
        self.api
            .send_json(Method::PUT, &["api", "introduction"], &intro)
            .await?;
        media.confirm();
        Ok(())
    }

    async fn get_achievements(&self) -> BackendResult<Vec<Achievement>> {
        self.api.get_json(&["api", "achievements"]).await
    }

    async fn add_achievement(&self, mut achievement: Achievement) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut achievement).await?;
        self.api
            .send_json(Method::POST, &["api", "achievements"], &achievement)
            .await?;
        media.confirm();
        Ok(())
    }

    async fn update_achievement(&self, mut achievement: Achievement) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut achievement).await?;
        self.api
            .send_json(
                Method::PUT,
                &["api", "achievements", achievement.id.as_str()],
                &achievement,
            )
            .await?;
        media.confirm();
        Ok(())
    }

    async fn delete_achievement(&self, id: &str) -> BackendResult<()> {
        self.api
            .send_no_body(Method::DELETE, &["api", "achievements", id])
            .await
    }

    async fn get_blog_posts(&self) -> BackendResult<Vec<BlogPost>> {
        self.api.get_json(&["api", "blog-posts"]).await
    }

    async fn add_blog_post(&self, mut post: BlogPost) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut post).await?;
        self.api
            .send_json(Method::POST, &["api", "blog-posts"], &post)
            .await?;
        media.confirm();
        Ok(())
    }

    async fn update_blog_post(&self, mut post: BlogPost) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut post).await?;
        self.api
            .send_json(Method::PUT, &["api", "blog-posts", post.id.as_str()], &post)
            .await?;
        media.confirm();
        Ok(())
    }

    async fn delete_blog_post(&self, id: &str) -> BackendResult<()> {
        self.api
            .send_no_body(Method::DELETE, &["api", "blog-posts", id])
            .await
    }

    async fn get_content_sections(&self) -> BackendResult<Vec<ContentSection>> {
        self.api.get_json(&["api", "content-sections"]).await
    }

    async fn add_content_section(&self, mut section: ContentSection) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut section).await?;
        self.api
            .send_json(Method::POST, &["api", "content-sections"], &section)
            .await?;
        media.confirm();
        Ok(())
    }

    async fn update_content_section(&self, mut section: ContentSection) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut section).await?;
        self.api
            .send_json(
                Method::PUT,
                &["api", "content-sections", section.id.as_str()],
                &section,
            )
            .await?;
        media.confirm();
        Ok(())
    }

    async fn delete_content_section(&self, id: &str) -> BackendResult<()> {
        self.api
            .send_no_body(Method::DELETE, &["api", "content-sections", id])
            .await
    }

    async fn get_contact_forms(&self) -> BackendResult<Vec<ContactForm>> {
        self.api.get_json(&["api", "contact-forms"]).await
    }

    async fn submit_contact_form(&self, form: ContactForm) -> BackendResult<()> {
        self.api
            .send_json(Method::POST, &["api", "contact-forms"], &form)
            .await
    }

    async fn get_cms_settings(&self) -> BackendResult<CmsSettings> {
        self.api.get_json(&["api", "cms-settings"]).await
    }

    async fn update_cms_settings(&self, settings: CmsSettings) -> BackendResult<()> {
        self.api
            .send_json(Method::PUT, &["api", "cms-settings"], &settings)
            .await
    }

    async fn get_ai_settings(&self) -> BackendResult<PublicAiSettings> {
        self.api.get_json(&["api", "ai-settings"]).await
    }

    async fn get_full_ai_settings(&self) -> BackendResult<AiSettings> {
        self.api.get_json(&["api", "ai-settings", "full"]).await
    }

    async fn update_ai_settings(&self, mut settings: AiSettings) -> BackendResult<()> {
        let media = self.uploader.persist_media(&mut settings).await?;
        self.api
            .send_json(Method::PUT, &["api", "ai-settings"], &settings)
            .await?;
        media.confirm();
        Ok(())
    }

    async fn get_site_stats(&self) -> BackendResult<SiteStats> {
        self.api.get_json(&["api", "site-stats"]).await
    }

    async fn update_site_stats(&self, stats: SiteStats) -> BackendResult<()> {
        self.api
            .send_json(Method::PUT, &["api", "site-stats"], &stats)
            .await
    }

    async fn is_caller_admin(&self) -> BackendResult<bool> {
        self.api.get_json(&["api", "session", "is-admin"]).await
    }

    async fn get_caller_user_role(&self) -> BackendResult<UserRole> {
        self.api.get_json(&["api", "session", "role"]).await
    }

    async fn assign_caller_user_role(&self, principal: &str, role: UserRole) -> BackendResult<()> {
        self.api
            .send_json(Method::POST, &["api", "roles"], &RoleAssignment { principal, role })
            .await
    }
}
