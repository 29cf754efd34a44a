#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use vetrina::application::{Backend, BackendError, BackendResult, Connector, Identity, SiteSync};
use vetrina::domain::{
    Achievement, AiSettings, BlogPost, CmsSettings, ContactForm, ContentSection, Introduction,
    PublicAiSettings, SiteStats, Timestamp, UserRole,
};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";

/// Records held by the fake backend, shared by every identity.
#[derive(Debug, Clone)]
pub struct SiteData {
    pub introduction: Introduction,
    pub achievements: Vec<Achievement>,
    pub blog_posts: Vec<BlogPost>,
    pub content_sections: Vec<ContentSection>,
    pub contact_forms: Vec<ContactForm>,
    pub cms: CmsSettings,
    pub ai: AiSettings,
    pub stats: SiteStats,
}

impl SiteData {
    pub fn seeded() -> Self {
        Self {
            introduction: Introduction::new("Ada", "Engineer", "Builds things.\n\nWrites about them."),
            achievements: vec![achievement("a1", "First talk", "2023-06-01")],
            blog_posts: vec![blog_post("p1", "Hello", "2024-02-10")],
            content_sections: vec![ContentSection {
                id: "about".to_string(),
                title: "About".to_string(),
                content: "Short bio".to_string(),
                image: None,
            }],
            contact_forms: vec![ContactForm::new("Jo", "jo@example.com", "Hi")],
            cms: CmsSettings {
                theme: "light".to_string(),
                layout_options: "grid".to_string(),
                custom_section_order: vec!["about".to_string()],
            },
            ai: AiSettings {
                bot_name: "Vee".to_string(),
                initial_greeting: "Hello!".to_string(),
                avatar_image: None,
                salesforce_api_key: "sf-secret".to_string(),
            },
            stats: SiteStats {
                total_blog_posts: 1,
                total_messages: 1,
                total_visits: 40,
                total_achievements: 1,
            },
        }
    }
}

pub fn achievement(id: &str, title: &str, date: &str) -> Achievement {
    Achievement {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        date: Timestamp::parse_date(date).expect("valid date"),
        image: None,
    }
}

pub fn blog_post(id: &str, title: &str, date: &str) -> BlogPost {
    BlogPost {
        id: id.to_string(),
        title: title.to_string(),
        content: format!("{title} body"),
        publication_date: Timestamp::parse_date(date).expect("valid date"),
        featured_image: None,
    }
}

/// In-memory backend state with call accounting, failure injection and
/// per-call holds that park a call until the test releases it.
#[derive(Debug)]
pub struct FakeSite {
    data: Mutex<SiteData>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
    holds: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
}

impl FakeSite {
    pub fn new(data: SiteData) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(data),
            calls: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            holds: Mutex::new(HashMap::new()),
        })
    }

    pub fn seeded() -> Arc<Self> {
        Self::new(SiteData::seeded())
    }

    pub fn calls(&self, call: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(call)
            .copied()
            .unwrap_or(0)
    }

    pub fn fail(&self, call: &'static str) {
        self.failing.lock().expect("failing lock").insert(call);
    }

    pub fn recover(&self, call: &'static str) {
        self.failing.lock().expect("failing lock").remove(call);
    }

    /// Park every later `call` until [`FakeSite::release`].
    pub fn hold(&self, call: &'static str) {
        self.holds
            .lock()
            .expect("holds lock")
            .insert(call, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, call: &'static str) {
        if let Some(hold) = self.holds.lock().expect("holds lock").remove(call) {
            hold.close();
        }
    }

    /// Stop parking new `call`s while calls already parked stay parked until
    /// the returned hold is closed.
    pub fn detach_hold(&self, call: &'static str) -> Option<Arc<Semaphore>> {
        self.holds.lock().expect("holds lock").remove(call)
    }

    pub fn data(&self) -> SiteData {
        self.data.lock().expect("data lock").clone()
    }

    /// Snapshot the records before entering, as a response computed ahead of
    /// a slow network would.
    async fn read<T: Send>(
        &self,
        call: &'static str,
        pick: impl FnOnce(SiteData) -> T + Send,
    ) -> BackendResult<T> {
        let snapshot = self.data();
        self.enter(call).await?;
        Ok(pick(snapshot))
    }

    fn edit<R>(&self, f: impl FnOnce(&mut SiteData) -> R) -> R {
        f(&mut self.data.lock().expect("data lock"))
    }

    async fn enter(&self, call: &'static str) -> BackendResult<()> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(call)
            .or_default() += 1;

        let hold = self.holds.lock().expect("holds lock").get(call).cloned();
        if let Some(hold) = hold {
            // Closing the semaphore is the release signal.
            let _ = hold.acquire().await;
        }

        if self.failing.lock().expect("failing lock").contains(call) {
            return Err(BackendError::Rejected(format!("{call} failed on purpose")));
        }
        Ok(())
    }
}

/// One identity's view of a [`FakeSite`].
#[derive(Debug)]
pub struct FakeBackend {
    site: Arc<FakeSite>,
    role: UserRole,
}

impl FakeBackend {
    fn require_admin(&self) -> BackendResult<()> {
        if self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(BackendError::Unauthorized)
        }
    }

    async fn admin_call(&self, call: &'static str) -> BackendResult<()> {
        self.site.enter(call).await?;
        self.require_admin()
    }
}

fn replace_by_id<T>(
    items: &mut [T],
    id: &str,
    item: T,
    id_of: impl Fn(&T) -> &str,
) -> BackendResult<()> {
    let index = items
        .iter()
        .position(|existing| id_of(existing) == id)
        .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
    items[index] = item;
    Ok(())
}

fn remove_by_id<T>(
    items: &mut Vec<T>,
    id: &str,
    id_of: impl Fn(&T) -> &str,
) -> BackendResult<()> {
    let before = items.len();
    items.retain(|item| id_of(item) != id);
    if items.len() == before {
        Err(BackendError::NotFound(id.to_string()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get_introduction(&self) -> BackendResult<Introduction> {
        self.site.read("getIntroduction", |data| data.introduction).await
    }

    async fn update_introduction(&self, intro: Introduction) -> BackendResult<()> {
        self.admin_call("updateIntroduction").await?;
        self.site.edit(|data| data.introduction = intro);
        Ok(())
    }

    async fn get_achievements(&self) -> BackendResult<Vec<Achievement>> {
        self.site.read("getAchievements", |data| data.achievements).await
    }

    async fn add_achievement(&self, achievement: Achievement) -> BackendResult<()> {
        self.admin_call("addAchievement").await?;
        self.site.edit(|data| {
            data.achievements.push(achievement);
            data.stats.total_achievements += 1;
        });
        Ok(())
    }

    async fn update_achievement(&self, achievement: Achievement) -> BackendResult<()> {
        self.admin_call("updateAchievement").await?;
        let id = achievement.id.clone();
        self.site
            .edit(|data| replace_by_id(&mut data.achievements, &id, achievement, |a| a.id.as_str()))
    }

    async fn delete_achievement(&self, id: &str) -> BackendResult<()> {
        self.admin_call("deleteAchievement").await?;
        self.site
            .edit(|data| remove_by_id(&mut data.achievements, id, |a| a.id.as_str()))
    }

    async fn get_blog_posts(&self) -> BackendResult<Vec<BlogPost>> {
        self.site.read("getBlogPosts", |data| data.blog_posts).await
    }

    async fn add_blog_post(&self, post: BlogPost) -> BackendResult<()> {
        self.admin_call("addBlogPost").await?;
        self.site.edit(|data| {
            data.blog_posts.push(post);
            data.stats.total_blog_posts += 1;
        });
        Ok(())
    }

    async fn update_blog_post(&self, post: BlogPost) -> BackendResult<()> {
        self.admin_call("updateBlogPost").await?;
        let id = post.id.clone();
        self.site
            .edit(|data| replace_by_id(&mut data.blog_posts, &id, post, |p| p.id.as_str()))
    }

    async fn delete_blog_post(&self, id: &str) -> BackendResult<()> {
        self.admin_call("deleteBlogPost").await?;
        self.site
            .edit(|data| remove_by_id(&mut data.blog_posts, id, |p| p.id.as_str()))
    }

    async fn get_content_sections(&self) -> BackendResult<Vec<ContentSection>> {
        self.site.read("getContentSections", |data| data.content_sections).await
    }

    async fn add_content_section(&self, section: ContentSection) -> BackendResult<()> {
        self.admin_call("addContentSection").await?;
        self.site.edit(|data| data.content_sections.push(section));
        Ok(())
    }

    async fn update_content_section(&self, section: ContentSection) -> BackendResult<()> {
        self.admin_call("updateContentSection").await?;
        let id = section.id.clone();
        self.site
            .edit(|data| replace_by_id(&mut data.content_sections, &id, section, |s| s.id.as_str()))
    }

    async fn delete_content_section(&self, id: &str) -> BackendResult<()> {
        self.admin_call("deleteContentSection").await?;
        self.site
            .edit(|data| remove_by_id(&mut data.content_sections, id, |s| s.id.as_str()))
    }

    async fn get_contact_forms(&self) -> BackendResult<Vec<ContactForm>> {
        self.admin_call("getContactForms").await?;
        Ok(self.site.data().contact_forms)
    }

    async fn submit_contact_form(&self, form: ContactForm) -> BackendResult<()> {
        self.site.enter("submitContactForm").await?;
        self.site.edit(|data| {
            data.contact_forms.push(form);
            data.stats.total_messages += 1;
        });
        Ok(())
    }

    async fn get_cms_settings(&self) -> BackendResult<CmsSettings> {
        self.site.read("getCmsSettings", |data| data.cms).await
    }

    async fn update_cms_settings(&self, settings: CmsSettings) -> BackendResult<()> {
        self.admin_call("updateCmsSettings").await?;
        self.site.edit(|data| data.cms = settings);
        Ok(())
    }

    async fn get_ai_settings(&self) -> BackendResult<PublicAiSettings> {
        self.site.read("getAiSettings", |data| data.ai.public_view()).await
    }

    async fn get_full_ai_settings(&self) -> BackendResult<AiSettings> {
        self.admin_call("getFullAiSettings").await?;
        Ok(self.site.data().ai)
    }

    async fn update_ai_settings(&self, settings: AiSettings) -> BackendResult<()> {
        self.admin_call("updateAiSettings").await?;
        self.site.edit(|data| data.ai = settings);
        Ok(())
    }

    async fn get_site_stats(&self) -> BackendResult<SiteStats> {
        self.site.read("getSiteStats", |data| data.stats).await
    }

    async fn update_site_stats(&self, stats: SiteStats) -> BackendResult<()> {
        self.admin_call("updateSiteStats").await?;
        self.site.edit(|data| data.stats = stats);
        Ok(())
    }

    async fn is_caller_admin(&self) -> BackendResult<bool> {
        self.site.enter("isCallerAdmin").await?;
        Ok(self.role == UserRole::Admin)
    }

    async fn get_caller_user_role(&self) -> BackendResult<UserRole> {
        self.site.enter("getCallerUserRole").await?;
        Ok(self.role)
    }

    async fn assign_caller_user_role(&self, _principal: &str, _role: UserRole) -> BackendResult<()> {
        self.admin_call("assignCallerUserRole").await
    }
}

/// Hands out a [`FakeBackend`] whose role follows the presented token.
#[derive(Debug)]
pub struct FakeConnector {
    site: Arc<FakeSite>,
    connects: AtomicUsize,
    hold: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeConnector {
    pub fn new(site: Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self {
            site,
            connects: AtomicUsize::new(0),
            hold: Mutex::new(None),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Park every later connect until [`FakeConnector::release`].
    pub fn hold(&self) {
        *self.hold.lock().expect("connect hold lock") = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self) {
        if let Some(hold) = self.hold.lock().expect("connect hold lock").take() {
            hold.close();
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn Backend>, BackendError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().expect("connect hold lock").clone();
        if let Some(hold) = hold {
            let _ = hold.acquire().await;
        }
        let role = match identity.token() {
            Some(ADMIN_TOKEN) => UserRole::Admin,
            Some(USER_TOKEN) => UserRole::User,
            Some(_) => return Err(BackendError::Unauthorized),
            None => UserRole::Guest,
        };
        Ok(Arc::new(FakeBackend {
            site: Arc::clone(&self.site),
            role,
        }))
    }
}

pub async fn connect(site: &Arc<FakeSite>, identity: Identity) -> SiteSync {
    SiteSync::connect(FakeConnector::new(Arc::clone(site)), identity)
        .await
        .expect("fake backend connects")
}

pub async fn admin_session(site: &Arc<FakeSite>) -> SiteSync {
    connect(site, Identity::bearer(ADMIN_TOKEN)).await
}

pub async fn visitor_session(site: &Arc<FakeSite>) -> SiteSync {
    connect(site, Identity::anonymous()).await
}
