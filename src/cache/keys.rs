//! Cache key definitions.
//!
//! One key per entity collection or singleton the site reads.

use std::fmt;

/// Identifies one cached query slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    // Singletons
    Introduction,
    CmsSettings,
    /// Public and privileged chatbot settings share this slot.
    AiSettings,
    SiteStats,
    /// Capability flag derived from `isCallerAdmin`.
    IsAdmin,

    // Collections
    Achievements,
    BlogPosts,
    ContactForms,
    ContentSections,
}

/// How a read reacts when the gateway is unavailable or the fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Public listings render an empty result instead of an error.
    DegradeToDefault,
    /// Singletons have nothing sensible to show and surface the error.
    Surface,
}

impl CacheKey {
    pub const ALL: [CacheKey; 9] = [
        CacheKey::Introduction,
        CacheKey::CmsSettings,
        CacheKey::AiSettings,
        CacheKey::SiteStats,
        CacheKey::IsAdmin,
        CacheKey::Achievements,
        CacheKey::BlogPosts,
        CacheKey::ContactForms,
        CacheKey::ContentSections,
    ];

    /// Stable name used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::CmsSettings => "cmsSettings",
            Self::AiSettings => "aiSettings",
            Self::SiteStats => "siteStats",
            Self::IsAdmin => "isAdmin",
            Self::Achievements => "achievements",
            Self::BlogPosts => "blogPosts",
            Self::ContactForms => "contactForms",
            Self::ContentSections => "contentSections",
        }
    }

    pub fn read_policy(self) -> ReadPolicy {
        match self {
            Self::Achievements
            | Self::BlogPosts
            | Self::ContactForms
            | Self::ContentSections
            | Self::IsAdmin => ReadPolicy::DegradeToDefault,
            Self::Introduction | Self::CmsSettings | Self::AiSettings | Self::SiteStats => {
                ReadPolicy::Surface
            }
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
