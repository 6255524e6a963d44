//! crates/echo_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port, used by the test
//! suites of this crate and of the HTTP service.
//!
//! All state sits behind one async mutex. An interaction transaction holds that
//! mutex for its whole lifetime and edits a private copy of the state, which is
//! written back only on commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    Article, ArticleId, Category, CategoryId, FeedQuery, Interaction, InteractionKind,
    InterestHistory, NewUser, Notification, NotificationId, Preference, User,
};
use crate::ports::{DatabaseService, InteractionTx, PortError, PortResult};

#[derive(Debug, Clone, Default)]
struct StoreState {
    users: Vec<User>,
    categories: Vec<Category>,
    articles: Vec<Article>,
    interactions: Vec<Interaction>,
    preferences: HashMap<Uuid, Preference>,
    interests: Vec<InterestHistory>,
    notifications: Vec<Notification>,
    last_id: i64,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn article(&self, article_id: ArticleId) -> PortResult<&Article> {
        self.articles
            .iter()
            .find(|a| a.id == article_id)
            .ok_or_else(|| PortError::NotFound(format!("Article {} not found", article_id)))
    }

    fn interaction(
        &self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> Option<&Interaction> {
        self.interactions
            .iter()
            .find(|i| i.user_id == user_id && i.article_id == article_id && i.kind == kind)
    }

    fn count(&self, article_id: ArticleId, kind: InteractionKind) -> i64 {
        self.interactions
            .iter()
            .filter(|i| i.article_id == article_id && i.kind == kind)
            .count() as i64
    }
}

/// A cheaply cloneable handle; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    //=====================================================================================
    // Seeding helpers (the parts of the data model this service never authors)
    //=====================================================================================

    pub async fn add_category(&self, name: &str) -> PortResult<Category> {
        let mut state = self.state.lock().await;
        if state.categories.iter().any(|c| c.name == name) {
            return Err(PortError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }
        let category = Category {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    /// Registers a bare user with an empty preference record.
    pub async fn add_user(&self, username: &str, email: &str) -> PortResult<User> {
        self.create_user_with_preference(&NewUser {
            username: username.to_string(),
            email: email.to_string(),
            ..NewUser::default()
        })
        .await
    }

    pub async fn publish(
        &self,
        title: &str,
        category_id: Option<CategoryId>,
        published_at: DateTime<Utc>,
    ) -> Article {
        let mut state = self.state.lock().await;
        let article = Article {
            id: state.next_id(),
            title: title.to_string(),
            body: String::new(),
            published_at,
            author_id: None,
            category_id,
            like_count: 0,
            save_count: 0,
        };
        state.articles.push(article.clone());
        article
    }

    pub async fn set_preference(&self, user_id: Uuid, category_ids: Vec<CategoryId>) {
        let mut state = self.state.lock().await;
        state.preferences.insert(
            user_id,
            Preference {
                user_id,
                category_ids,
            },
        );
    }

    /// Inserts or replaces the score for (user, category).
    pub async fn add_interest(&self, user_id: Uuid, category_id: CategoryId, score: i64) {
        let mut state = self.state.lock().await;
        state
            .interests
            .retain(|h| !(h.user_id == user_id && h.category_id == category_id));
        state.interests.push(InterestHistory {
            user_id,
            category_id,
            score,
        });
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        headline: &str,
        article_id: Option<ArticleId>,
    ) -> Notification {
        let mut state = self.state.lock().await;
        let notification = Notification {
            id: state.next_id(),
            user_id,
            headline: headline.to_string(),
            article_id,
            created_at: Utc::now(),
            read: false,
        };
        state.notifications.push(notification.clone());
        notification
    }

    /// Live row count, for checking the cached counters against.
    pub async fn interaction_count(&self, article_id: ArticleId, kind: InteractionKind) -> i64 {
        self.state.lock().await.count(article_id, kind)
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

/// Case-insensitive comparison matching the `LOWER(...)` unique indexes.
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let state = self.state.lock().await;
        state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn username_taken(&self, username: &str) -> PortResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .any(|u| same_name(&u.username, username)))
    }

    async fn email_taken(&self, email: &str) -> PortResult<bool> {
        let state = self.state.lock().await;
        Ok(state.users.iter().any(|u| same_name(&u.email, email)))
    }

    async fn create_user_with_preference(&self, new_user: &NewUser) -> PortResult<User> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| {
            same_name(&u.username, &new_user.username) || same_name(&u.email, &new_user.email)
        }) {
            return Err(PortError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            display_name: new_user.display_name.clone(),
        };
        let category_ids = new_user
            .category_ids
            .iter()
            .copied()
            .filter(|id| state.categories.iter().any(|c| c.id == *id))
            .collect();
        state.preferences.insert(
            user.id,
            Preference {
                user_id: user.id,
                category_ids,
            },
        );
        state.users.push(user.clone());
        Ok(user)
    }

    async fn list_categories(&self) -> PortResult<Vec<Category>> {
        let mut categories = self.state.lock().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_categories(&self, ids: &[CategoryId]) -> PortResult<Vec<Category>> {
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_article(&self, article_id: ArticleId) -> PortResult<Article> {
        self.state.lock().await.article(article_id).cloned()
    }

    async fn list_articles(&self, query: &FeedQuery) -> PortResult<Vec<Article>> {
        let state = self.state.lock().await;
        let mut articles: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        articles.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(articles)
    }

    async fn has_interaction(
        &self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .interaction(user_id, article_id, kind)
            .is_some())
    }

    async fn get_preference(&self, user_id: Uuid) -> PortResult<Option<Preference>> {
        Ok(self.state.lock().await.preferences.get(&user_id).cloned())
    }

    async fn top_interest_categories(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<CategoryId>> {
        let state = self.state.lock().await;
        let mut rows: Vec<&InterestHistory> =
            state.interests.iter().filter(|h| h.user_id == user_id).collect();
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        Ok(rows.into_iter().take(limit).map(|h| h.category_id).collect())
    }

    async fn begin_interaction(&self) -> PortResult<Box<dyn InteractionTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryInteractionTx { guard, working }))
    }

    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<Notification>> {
        let state = self.state.lock().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.read.cmp(&b.read))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(notifications)
    }

    async fn get_notification(
        &self,
        user_id: Uuid,
        notification_id: NotificationId,
    ) -> PortResult<Notification> {
        let state = self.state.lock().await;
        state
            .notifications
            .iter()
            .find(|n| n.id == notification_id && n.user_id == user_id)
            .cloned()
            .ok_or_else(|| {
                PortError::NotFound(format!("Notification {} not found", notification_id))
            })
    }

    async fn mark_notification_read(&self, notification_id: NotificationId) -> PortResult<()> {
        let mut state = self.state.lock().await;
        if let Some(n) = state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
        {
            n.read = true;
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

//=========================================================================================
// Interaction Transaction
//=========================================================================================

struct MemoryInteractionTx {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
}

#[async_trait]
impl InteractionTx for MemoryInteractionTx {
    async fn find_article(&mut self, article_id: ArticleId) -> PortResult<Article> {
        self.working.article(article_id).cloned()
    }

    async fn find_interaction(
        &mut self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<Option<Interaction>> {
        Ok(self.working.interaction(user_id, article_id, kind).cloned())
    }

    async fn create_interaction(
        &mut self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<Interaction> {
        if let Some(existing) = self.working.interaction(user_id, article_id, kind) {
            return Ok(existing.clone());
        }
        let interaction = Interaction {
            id: self.working.next_id(),
            user_id,
            article_id,
            kind,
            created_at: Utc::now(),
        };
        self.working.interactions.push(interaction.clone());
        Ok(interaction)
    }

    async fn delete_interaction(&mut self, interaction: &Interaction) -> PortResult<()> {
        self.working.interactions.retain(|i| i.id != interaction.id);
        Ok(())
    }

    async fn count_interactions(
        &mut self,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<i64> {
        Ok(self.working.count(article_id, kind))
    }

    async fn save_article(&mut self, article: &Article) -> PortResult<()> {
        let stored = self
            .working
            .articles
            .iter_mut()
            .find(|a| a.id == article.id)
            .ok_or_else(|| PortError::NotFound(format!("Article {} not found", article.id)))?;
        stored.like_count = article.like_count;
        stored.save_count = article.save_count;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        let MemoryInteractionTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
