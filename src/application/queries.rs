//! Typed reads over the query cache.
//!
//! Failures follow [`CacheKey::read_policy`]: listing keys and the admin flag
//! degrade to an empty/false value so public pages stay renderable, singleton
//! settings surface their error.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, QueryCache, QuerySlot, ReadPolicy};
use crate::domain::{
    Achievement, AiSettings, AiSettingsRecord, BlogPost, CmsSettings, ContactForm,
    ContentSection, Introduction, PublicAiSettings, SiteStats, UserRole,
};

use super::backend::{Backend, BackendResult};
use super::error::SyncError;
use super::gateway::RemoteGateway;

/// What the current caller may do, derived from cached capability keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct QueryService {
    gateway: Arc<RemoteGateway>,
    cache: QueryCache,
}

impl QueryService {
    pub fn new(gateway: Arc<RemoteGateway>, cache: QueryCache) -> Self {
        Self { gateway, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn introduction(&self) -> Result<Arc<Introduction>, SyncError> {
        self.read(self.cache.introduction(), "getIntroduction", |backend| async move {
            backend.get_introduction().await
        })
        .await
    }

    pub async fn cms_settings(&self) -> Result<Arc<CmsSettings>, SyncError> {
        self.read(self.cache.cms_settings(), "getCmsSettings", |backend| async move {
            backend.get_cms_settings().await
        })
        .await
    }

    pub async fn site_stats(&self) -> Result<Arc<SiteStats>, SyncError> {
        self.read(self.cache.site_stats(), "getSiteStats", |backend| async move {
            backend.get_site_stats().await
        })
        .await
    }

    pub async fn achievements(&self) -> Arc<Vec<Achievement>> {
        self.read(self.cache.achievements(), "getAchievements", |backend| async move {
            backend.get_achievements().await
        })
        .await
        .unwrap_or_default()
    }

    pub async fn blog_posts(&self) -> Arc<Vec<BlogPost>> {
        self.read(self.cache.blog_posts(), "getBlogPosts", |backend| async move {
            backend.get_blog_posts().await
        })
        .await
        .unwrap_or_default()
    }

    pub async fn content_sections(&self) -> Arc<Vec<ContentSection>> {
        self.read(
            self.cache.content_sections(),
            "getContentSections",
            |backend| async move { backend.get_content_sections().await },
        )
        .await
        .unwrap_or_default()
    }

    pub async fn contact_forms(&self) -> Arc<Vec<ContactForm>> {
        self.read(self.cache.contact_forms(), "getContactForms", |backend| async move {
            backend.get_contact_forms().await
        })
        .await
        .unwrap_or_default()
    }

    /// Cached admin flag. Anything but a confirmed `true` reads as `false`.
    pub async fn is_admin(&self) -> bool {
        let flag = self
            .read(self.cache.is_admin(), "isCallerAdmin", |backend| async move {
                backend.is_caller_admin().await
            })
            .await
            .unwrap_or_default();
        *flag
    }

    pub async fn capabilities(&self) -> Capabilities {
        Capabilities {
            is_admin: self.is_admin().await,
        }
    }

    /// Chatbot settings any visitor may see.
    pub async fn ai_settings(&self) -> Result<PublicAiSettings, SyncError> {
        Ok(self.ai_record().await?.public_view())
    }

    /// Chatbot settings including the secret; [`SyncError::Forbidden`] for non-admins.
    pub async fn full_ai_settings(&self) -> Result<AiSettings, SyncError> {
        let record = self.ai_record().await?;
        record
            .full()
            .cloned()
            .ok_or_else(|| SyncError::forbidden("getFullAiSettings"))
    }

    /// The caller's role, read straight from the backend.
    #[instrument(skip(self))]
    pub async fn caller_role(&self) -> Result<UserRole, SyncError> {
        let handle = self.gateway.handle()?;
        handle
            .backend
            .get_caller_user_role()
            .await
            .map_err(|err| SyncError::from_backend("getCallerUserRole", err))
    }

    /// One slot backs both AI settings views. Admins get the privileged record
    /// and everyone else the public one.
    ///
    /// The view is picked from the admin flag as fetched, not as degraded: an
    /// unknown capability errors the slot instead of caching the public view.
    async fn ai_record(&self) -> Result<Arc<AiSettingsRecord>, SyncError> {
        let handle = self.gateway.handle()?;
        let epoch = handle.epoch;
        let backend = handle.backend;
        let admin_slot = self.cache.is_admin().clone();

        self.cache
            .ai_settings()
            .read(epoch, move || {
                let backend = Arc::clone(&backend);
                let admin_slot = admin_slot.clone();
                async move {
                    let is_admin = caller_is_admin(&admin_slot, epoch, &backend).await?;
                    if is_admin {
                        backend
                            .get_full_ai_settings()
                            .await
                            .map(AiSettingsRecord::Full)
                            .map_err(|err| SyncError::from_backend("getFullAiSettings", err))
                    } else {
                        backend
                            .get_ai_settings()
                            .await
                            .map(AiSettingsRecord::Public)
                            .map_err(|err| SyncError::from_backend("getAiSettings", err))
                    }
                }
            })
            .await
    }

    /// Read `slot` through the current handle and apply the key's
    /// [`ReadPolicy`] to a failure.
    async fn read<T, F, Fut>(
        &self,
        slot: &QuerySlot<T>,
        call: &'static str,
        fetch: F,
    ) -> Result<Arc<T>, SyncError>
    where
        T: Default + Send + Sync + 'static,
        F: Fn(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = BackendResult<T>> + Send + 'static,
    {
        let result = match self.gateway.handle() {
            Ok(handle) => {
                let backend = handle.backend;
                slot.read(handle.epoch, || {
                    let pending = fetch(Arc::clone(&backend));
                    async move {
                        pending
                            .await
                            .map_err(|err| SyncError::from_backend(call, err))
                    }
                })
                .await
            }
            Err(err) => Err(err),
        };
        apply_read_policy(slot.key(), result)
    }
}

async fn caller_is_admin(
    slot: &QuerySlot<bool>,
    epoch: u64,
    backend: &Arc<dyn Backend>,
) -> Result<bool, SyncError> {
    let backend = Arc::clone(backend);
    let flag = slot
        .read(epoch, move || {
            let backend = Arc::clone(&backend);
            async move {
                backend
                    .is_caller_admin()
                    .await
                    .map_err(|err| SyncError::from_backend("isCallerAdmin", err))
            }
        })
        .await?;
    Ok(*flag)
}

fn apply_read_policy<T: Default>(
    key: CacheKey,
    result: Result<Arc<T>, SyncError>,
) -> Result<Arc<T>, SyncError> {
    let err = match result {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    match key.read_policy() {
        ReadPolicy::Surface => Err(err),
        ReadPolicy::DegradeToDefault => {
            if err.is_not_ready() {
                debug!(key = key.as_str(), "Gateway not ready; rendering empty");
            } else {
                warn!(key = key.as_str(), error = %err, "Query failed; rendering empty");
            }
            Ok(Arc::default())
        }
    }
}
