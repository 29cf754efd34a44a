//! Typed query slots for every key the site reads.

use std::collections::BTreeMap;

use metrics::counter;
use tracing::{debug, info};

use crate::domain::{
    Achievement, AiSettingsRecord, BlogPost, CmsSettings, ContactForm, ContentSection,
    Introduction, SiteStats,
};

use super::keys::CacheKey;
use super::planner::InvalidationPlan;
use super::slot::{QuerySlot, QueryStatus};

pub const METRIC_CACHE_INVALIDATE: &str = "vetrina_cache_invalidate_total";

/// Client-side query cache keyed by [`CacheKey`].
///
/// Cloning is cheap and every clone shares the same slots.
#[derive(Clone)]
pub struct QueryCache {
    introduction: QuerySlot<Introduction>,
    cms_settings: QuerySlot<CmsSettings>,
    ai_settings: QuerySlot<AiSettingsRecord>,
    site_stats: QuerySlot<SiteStats>,
    is_admin: QuerySlot<bool>,
    achievements: QuerySlot<Vec<Achievement>>,
    blog_posts: QuerySlot<Vec<BlogPost>>,
    contact_forms: QuerySlot<Vec<ContactForm>>,
    content_sections: QuerySlot<Vec<ContentSection>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            introduction: QuerySlot::new(CacheKey::Introduction),
            cms_settings: QuerySlot::new(CacheKey::CmsSettings),
            ai_settings: QuerySlot::new(CacheKey::AiSettings),
            site_stats: QuerySlot::new(CacheKey::SiteStats),
            is_admin: QuerySlot::new(CacheKey::IsAdmin),
            achievements: QuerySlot::new(CacheKey::Achievements),
            blog_posts: QuerySlot::new(CacheKey::BlogPosts),
            contact_forms: QuerySlot::new(CacheKey::ContactForms),
            content_sections: QuerySlot::new(CacheKey::ContentSections),
        }
    }

    pub fn introduction(&self) -> &QuerySlot<Introduction> {
        &self.introduction
    }

    pub fn cms_settings(&self) -> &QuerySlot<CmsSettings> {
        &self.cms_settings
    }

    pub fn ai_settings(&self) -> &QuerySlot<AiSettingsRecord> {
        &self.ai_settings
    }

    pub fn site_stats(&self) -> &QuerySlot<SiteStats> {
        &self.site_stats
    }

    pub fn is_admin(&self) -> &QuerySlot<bool> {
        &self.is_admin
    }

    pub fn achievements(&self) -> &QuerySlot<Vec<Achievement>> {
        &self.achievements
    }

    pub fn blog_posts(&self) -> &QuerySlot<Vec<BlogPost>> {
        &self.blog_posts
    }

    pub fn contact_forms(&self) -> &QuerySlot<Vec<ContactForm>> {
        &self.contact_forms
    }

    pub fn content_sections(&self) -> &QuerySlot<Vec<ContentSection>> {
        &self.content_sections
    }

    pub fn status(&self, key: CacheKey) -> QueryStatus {
        match key {
            CacheKey::Introduction => self.introduction.status(),
            CacheKey::CmsSettings => self.cms_settings.status(),
            CacheKey::AiSettings => self.ai_settings.status(),
            CacheKey::SiteStats => self.site_stats.status(),
            CacheKey::IsAdmin => self.is_admin.status(),
            CacheKey::Achievements => self.achievements.status(),
            CacheKey::BlogPosts => self.blog_posts.status(),
            CacheKey::ContactForms => self.contact_forms.status(),
            CacheKey::ContentSections => self.content_sections.status(),
        }
    }

    /// Status of every slot, ordered by key.
    pub fn statuses(&self) -> BTreeMap<CacheKey, QueryStatus> {
        CacheKey::ALL
            .iter()
            .map(|key| (*key, self.status(*key)))
            .collect()
    }

    /// Mark one key stale. Returns true when the slot held fresh or in-flight data.
    pub fn invalidate(&self, key: CacheKey) -> bool {
        let changed = match key {
            CacheKey::Introduction => self.introduction.invalidate(),
            CacheKey::CmsSettings => self.cms_settings.invalidate(),
            CacheKey::AiSettings => self.ai_settings.invalidate(),
            CacheKey::SiteStats => self.site_stats.invalidate(),
            CacheKey::IsAdmin => self.is_admin.invalidate(),
            CacheKey::Achievements => self.achievements.invalidate(),
            CacheKey::BlogPosts => self.blog_posts.invalidate(),
            CacheKey::ContactForms => self.contact_forms.invalidate(),
            CacheKey::ContentSections => self.content_sections.invalidate(),
        };
        counter!(METRIC_CACHE_INVALIDATE, "key" => key.as_str()).increment(1);
        debug!(key = key.as_str(), changed, "Cache key invalidated");
        changed
    }

    pub fn invalidate_plan(&self, plan: &InvalidationPlan) {
        for key in plan.keys() {
            self.invalidate(key);
        }
    }

    /// Forget every cached value and bind all slots to `epoch`.
    pub fn reset(&self, epoch: u64) {
        self.introduction.reset(epoch);
        self.cms_settings.reset(epoch);
        self.ai_settings.reset(epoch);
        self.site_stats.reset(epoch);
        self.is_admin.reset(epoch);
        self.achievements.reset(epoch);
        self.blog_posts.reset(epoch);
        self.contact_forms.reset(epoch);
        self.content_sections.reset(epoch);
        info!(epoch, "Query cache reset");
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::application::error::SyncError;

    #[tokio::test]
    async fn invalidate_touches_only_named_key() {
        let cache = QueryCache::new();
        cache
            .achievements()
            .read(0, || async { Ok::<_, SyncError>(Vec::new()) }.boxed())
            .await
            .expect("read");
        cache
            .site_stats()
            .read(0, || async { Ok(SiteStats::default()) })
            .await
            .expect("read");

        assert!(cache.invalidate(CacheKey::Achievements));
        assert_eq!(cache.status(CacheKey::Achievements), QueryStatus::Stale);
        assert_eq!(cache.status(CacheKey::SiteStats), QueryStatus::Fresh);
        assert_eq!(cache.status(CacheKey::BlogPosts), QueryStatus::NotReady);
    }

    #[tokio::test]
    async fn reset_returns_every_slot_to_not_ready() {
        let cache = QueryCache::new();
        cache
            .is_admin()
            .read(0, || async { Ok(true) })
            .await
            .expect("read");

        cache.reset(1);
        assert!(
            cache
                .statuses()
                .values()
                .all(|status| *status == QueryStatus::NotReady)
        );
        assert!(cache.is_admin().peek().is_none());
    }
}
