//! Confirm-then-refresh writes.
//!
//! A write goes to the backend first. Only once the backend accepts it are the
//! keys in its [`InvalidationPlan`] marked stale; a rejected write leaves the
//! cache untouched.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument, warn};

use crate::cache::{InvalidationPlan, MutationKind, QueryCache};
use crate::domain::{
    Achievement, AiSettings, BlogPost, CmsSettings, ContactForm, ContentSection, Introduction,
    SiteStats, UserRole,
};

use super::backend::{Backend, BackendResult};
use super::error::{MutationError, SyncError};
use super::gateway::RemoteGateway;

pub const METRIC_MUTATION: &str = "vetrina_mutation_total";
pub const METRIC_MUTATION_FAILED: &str = "vetrina_mutation_failed_total";

/// One write with its payload.
#[derive(Debug, Clone)]
pub enum Mutation {
    UpdateIntroduction(Introduction),
    AddAchievement(Achievement),
    UpdateAchievement(Achievement),
    DeleteAchievement { id: String },
    AddBlogPost(BlogPost),
    UpdateBlogPost(BlogPost),
    DeleteBlogPost { id: String },
    AddContentSection(ContentSection),
    UpdateContentSection(ContentSection),
    DeleteContentSection { id: String },
    SubmitContactForm(ContactForm),
    UpdateCmsSettings(CmsSettings),
    UpdateAiSettings(AiSettings),
    UpdateSiteStats(SiteStats),
    AssignCallerUserRole { principal: String, role: UserRole },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::UpdateIntroduction(_) => MutationKind::UpdateIntroduction,
            Self::AddAchievement(_) => MutationKind::AddAchievement,
            Self::UpdateAchievement(_) => MutationKind::UpdateAchievement,
            Self::DeleteAchievement { .. } => MutationKind::DeleteAchievement,
            Self::AddBlogPost(_) => MutationKind::AddBlogPost,
            Self::UpdateBlogPost(_) => MutationKind::UpdateBlogPost,
            Self::DeleteBlogPost { .. } => MutationKind::DeleteBlogPost,
            Self::AddContentSection(_) => MutationKind::AddContentSection,
            Self::UpdateContentSection(_) => MutationKind::UpdateContentSection,
            Self::DeleteContentSection { .. } => MutationKind::DeleteContentSection,
            Self::SubmitContactForm(_) => MutationKind::SubmitContactForm,
            Self::UpdateCmsSettings(_) => MutationKind::UpdateCmsSettings,
            Self::UpdateAiSettings(_) => MutationKind::UpdateAiSettings,
            Self::UpdateSiteStats(_) => MutationKind::UpdateSiteStats,
            Self::AssignCallerUserRole { .. } => MutationKind::AssignCallerUserRole,
        }
    }

    async fn send(self, backend: &dyn Backend) -> BackendResult<()> {
        match self {
            Self::UpdateIntroduction(intro) => backend.update_introduction(intro).await,
            Self::AddAchievement(achievement) => backend.add_achievement(achievement).await,
            Self::UpdateAchievement(achievement) => backend.update_achievement(achievement).await,
            Self::DeleteAchievement { id } => backend.delete_achievement(&id).await,
            Self::AddBlogPost(post) => backend.add_blog_post(post).await,
            Self::UpdateBlogPost(post) => backend.update_blog_post(post).await,
            Self::DeleteBlogPost { id } => backend.delete_blog_post(&id).await,
            Self::AddContentSection(section) => backend.add_content_section(section).await,
            Self::UpdateContentSection(section) => backend.update_content_section(section).await,
            Self::DeleteContentSection { id } => backend.delete_content_section(&id).await,
            Self::SubmitContactForm(form) => backend.submit_contact_form(form).await,
            Self::UpdateCmsSettings(settings) => backend.update_cms_settings(settings).await,
            Self::UpdateAiSettings(settings) => backend.update_ai_settings(settings).await,
            Self::UpdateSiteStats(stats) => backend.update_site_stats(stats).await,
            Self::AssignCallerUserRole { principal, role } => {
                backend.assign_caller_user_role(&principal, role).await
            }
        }
    }
}

#[derive(Clone)]
pub struct MutationDispatcher {
    gateway: Arc<RemoteGateway>,
    cache: QueryCache,
}

impl MutationDispatcher {
    pub fn new(gateway: Arc<RemoteGateway>, cache: QueryCache) -> Self {
        Self { gateway, cache }
    }

    /// Send one write and, once the backend accepts it, mark its dependent keys stale.
    ///
    /// Writes are independent; a caller changing two entities issues two
    /// dispatches and handles partial completion itself.
    #[instrument(skip_all, fields(mutation = %mutation.kind()))]
    pub async fn dispatch(&self, mutation: Mutation) -> Result<(), MutationError> {
        let kind = mutation.kind();
        counter!(METRIC_MUTATION, "mutation" => kind.call_name()).increment(1);

        let outcome = match self.gateway.handle() {
            Ok(handle) => mutation
                .send(handle.backend.as_ref())
                .await
                .map_err(|err| SyncError::from_backend(kind.call_name(), err)),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                let plan = InvalidationPlan::for_mutation(kind);
                self.cache.invalidate_plan(&plan);
                info!(mutation = kind.call_name(), invalidated = %plan, "Mutation applied");
                Ok(())
            }
            Err(err) => {
                counter!(METRIC_MUTATION_FAILED, "mutation" => kind.call_name()).increment(1);
                warn!(mutation = kind.call_name(), error = %err, "Mutation failed");
                Err(MutationError::new(kind, err))
            }
        }
    }

    pub async fn update_introduction(&self, intro: Introduction) -> Result<(), MutationError> {
        self.dispatch(Mutation::UpdateIntroduction(intro)).await
    }

    pub async fn add_achievement(&self, achievement: Achievement) -> Result<(), MutationError> {
        self.dispatch(Mutation::AddAchievement(achievement)).await
    }

    pub async fn update_achievement(&self, achievement: Achievement) -> Result<(), MutationError> {
        self.dispatch(Mutation::UpdateAchievement(achievement)).await
    }

    pub async fn delete_achievement(&self, id: impl Into<String>) -> Result<(), MutationError> {
        self.dispatch(Mutation::DeleteAchievement { id: id.into() })
            .await
    }

    pub async fn add_blog_post(&self, post: BlogPost) -> Result<(), MutationError> {
        self.dispatch(Mutation::AddBlogPost(post)).await
    }

    pub async fn update_blog_post(&self, post: BlogPost) -> Result<(), MutationError> {
        self.dispatch(Mutation::UpdateBlogPost(post)).await
    }

    pub async fn delete_blog_post(&self, id: impl Into<String>) -> Result<(), MutationError> {
        self.dispatch(Mutation::DeleteBlogPost { id: id.into() }).await
    }

    pub async fn add_content_section(&self, section: ContentSection) -> Result<(), MutationError> {
        self.dispatch(Mutation::AddContentSection(section)).await
    }

    pub async fn update_content_section(
        &self,
        section: ContentSection,
    ) -> Result<(), MutationError> {
        self.dispatch(Mutation::UpdateContentSection(section)).await
    }

    pub async fn delete_content_section(&self, id: impl Into<String>) -> Result<(), MutationError> {
        self.dispatch(Mutation::DeleteContentSection { id: id.into() })
            .await
    }

    pub async fn submit_contact_form(&self, form: ContactForm) -> Result<(), MutationError> {
        self.dispatch(Mutation::SubmitContactForm(form)).await
    }

    pub async fn update_cms_settings(&self, settings: CmsSettings) -> Result<(), MutationError> {
        self.dispatch(Mutation::UpdateCmsSettings(settings)).await
    }

    pub async fn update_ai_settings(&self, settings: AiSettings) -> Result<(), MutationError> {
        self.dispatch(Mutation::UpdateAiSettings(settings)).await
    }

    pub async fn update_site_stats(&self, stats: SiteStats) -> Result<(), MutationError> {
        self.dispatch(Mutation::UpdateSiteStats(stats)).await
    }

    pub async fn assign_caller_user_role(
        &self,
        principal: impl Into<String>,
        role: UserRole,
    ) -> Result<(), MutationError> {
        self.dispatch(Mutation::AssignCallerUserRole {
            principal: principal.into(),
            role,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_reports_its_kind() {
        let delete = Mutation::DeleteBlogPost { id: "p1".into() };
        assert_eq!(delete.kind(), MutationKind::DeleteBlogPost);

        let form = Mutation::SubmitContactForm(ContactForm::new("Jo", "jo@example.com", "Hi"));
        assert_eq!(form.kind().call_name(), "submitContactForm");
    }
}
