//! Invalidation plan generation.
//!
//! Maps a successful write to the cache keys whose displayed data depends on it.

use std::collections::BTreeSet;
use std::fmt;

use super::keys::CacheKey;

/// Every write the site can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    UpdateIntroduction,
    AddAchievement,
    UpdateAchievement,
    DeleteAchievement,
    AddBlogPost,
    UpdateBlogPost,
    DeleteBlogPost,
    AddContentSection,
    UpdateContentSection,
    DeleteContentSection,
    SubmitContactForm,
    UpdateCmsSettings,
    UpdateAiSettings,
    UpdateSiteStats,
    AssignCallerUserRole,
}

impl MutationKind {
    pub const ALL: [MutationKind; 15] = [
        MutationKind::UpdateIntroduction,
        MutationKind::AddAchievement,
        MutationKind::UpdateAchievement,
        MutationKind::DeleteAchievement,
        MutationKind::AddBlogPost,
        MutationKind::UpdateBlogPost,
        MutationKind::DeleteBlogPost,
        MutationKind::AddContentSection,
        MutationKind::UpdateContentSection,
        MutationKind::DeleteContentSection,
        MutationKind::SubmitContactForm,
        MutationKind::UpdateCmsSettings,
        MutationKind::UpdateAiSettings,
        MutationKind::UpdateSiteStats,
        MutationKind::AssignCallerUserRole,
    ];

    /// Backend call name, also used as the metric label.
    pub fn call_name(self) -> &'static str {
        match self {
            Self::UpdateIntroduction => "updateIntroduction",
            Self::AddAchievement => "addAchievement",
            Self::UpdateAchievement => "updateAchievement",
            Self::DeleteAchievement => "deleteAchievement",
            Self::AddBlogPost => "addBlogPost",
            Self::UpdateBlogPost => "updateBlogPost",
            Self::DeleteBlogPost => "deleteBlogPost",
            Self::AddContentSection => "addContentSection",
            Self::UpdateContentSection => "updateContentSection",
            Self::DeleteContentSection => "deleteContentSection",
            Self::SubmitContactForm => "submitContactForm",
            Self::UpdateCmsSettings => "updateCmsSettings",
            Self::UpdateAiSettings => "updateAiSettings",
            Self::UpdateSiteStats => "updateSiteStats",
            Self::AssignCallerUserRole => "assignCallerUserRole",
        }
    }

    /// Human phrase completing "failed to ...".
    pub fn label(self) -> &'static str {
        match self {
            Self::UpdateIntroduction => "update introduction",
            Self::AddAchievement => "add achievement",
            Self::UpdateAchievement => "update achievement",
            Self::DeleteAchievement => "delete achievement",
            Self::AddBlogPost => "add blog post",
            Self::UpdateBlogPost => "update blog post",
            Self::DeleteBlogPost => "delete blog post",
            Self::AddContentSection => "add content section",
            Self::UpdateContentSection => "update content section",
            Self::DeleteContentSection => "delete content section",
            Self::SubmitContactForm => "submit contact form",
            Self::UpdateCmsSettings => "update CMS settings",
            Self::UpdateAiSettings => "update AI settings",
            Self::UpdateSiteStats => "update site stats",
            Self::AssignCallerUserRole => "assign user role",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.call_name())
    }
}

/// Keys to mark stale after a write succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    keys: BTreeSet<CacheKey>,
}

impl InvalidationPlan {
    pub fn for_mutation(kind: MutationKind) -> Self {
        use CacheKey as K;
        use MutationKind as M;

        let keys: &[CacheKey] = match kind {
            M::UpdateIntroduction => &[K::Introduction],
            // Creation changes the backend's counters; edits and deletes don't.
            M::AddAchievement => &[K::Achievements, K::SiteStats],
            M::UpdateAchievement | M::DeleteAchievement => &[K::Achievements],
            M::AddBlogPost => &[K::BlogPosts, K::SiteStats],
            M::UpdateBlogPost | M::DeleteBlogPost => &[K::BlogPosts],
            M::AddContentSection | M::UpdateContentSection | M::DeleteContentSection => {
                &[K::ContentSections]
            }
            M::SubmitContactForm => &[K::ContactForms, K::SiteStats],
            M::UpdateCmsSettings => &[K::CmsSettings],
            // Public and privileged projections live in the one slot.
            M::UpdateAiSettings => &[K::AiSettings],
            M::UpdateSiteStats => &[K::SiteStats],
            // The AI settings projection was chosen by the old capability.
            M::AssignCallerUserRole => &[K::AiSettings, K::IsAdmin],
        };

        Self {
            keys: keys.iter().copied().collect(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = CacheKey> + '_ {
        self.keys.iter().copied()
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.keys.iter().map(|key| key.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
