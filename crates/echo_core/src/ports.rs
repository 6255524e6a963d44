//! crates/echo_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete persistence layer.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Article, ArticleId, Category, CategoryId, FeedQuery, Interaction, InteractionKind, NewUser,
    Notification, NotificationId, Preference, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the underlying store.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    /// Case-insensitive.
    async fn username_taken(&self, username: &str) -> PortResult<bool>;

    /// Case-insensitive.
    async fn email_taken(&self, email: &str) -> PortResult<bool>;

    /// Creates the user and its preference record in one transaction.
    /// Category ids that do not exist are dropped.
    async fn create_user_with_preference(&self, new_user: &NewUser) -> PortResult<User>;

    // --- Categories ---
    async fn list_categories(&self) -> PortResult<Vec<Category>>;

    async fn get_categories(&self, ids: &[CategoryId]) -> PortResult<Vec<Category>>;

    // --- Articles ---
    async fn get_article(&self, article_id: ArticleId) -> PortResult<Article>;

    /// Publication timestamp descending, then id descending.
    async fn list_articles(&self, query: &FeedQuery) -> PortResult<Vec<Article>>;

    async fn has_interaction(
        &self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<bool>;

    // --- Ranking Signals ---
    async fn get_preference(&self, user_id: Uuid) -> PortResult<Option<Preference>>;

    /// Highest score first, ties by category id ascending.
    async fn top_interest_categories(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<CategoryId>>;

    // --- Interactions ---
    /// Opens a transaction for a single toggle. Dropping it without calling
    /// `commit` discards every change made through it.
    async fn begin_interaction(&self) -> PortResult<Box<dyn InteractionTx>>;

    // --- Notifications ---
    /// Newest first, unread before read on equal timestamps.
    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<Notification>>;

    /// Only returns the notification if `user_id` owns it.
    async fn get_notification(
        &self,
        user_id: Uuid,
        notification_id: NotificationId,
    ) -> PortResult<Notification>;

    async fn mark_notification_read(&self, notification_id: NotificationId) -> PortResult<()>;

    /// Returns the number of notifications that changed.
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64>;
}

/// The unit of work behind one interaction toggle.
///
/// `find_article` must be the first call: implementations take an exclusive
/// lock on the article there, so concurrent toggles on it run one at a time.
#[async_trait]
pub trait InteractionTx: Send {
    async fn find_article(&mut self, article_id: ArticleId) -> PortResult<Article>;

    async fn find_interaction(
        &mut self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<Option<Interaction>>;

    /// A no-op returning the existing row if the triple is already present.
    async fn create_interaction(
        &mut self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<Interaction>;

    async fn delete_interaction(&mut self, interaction: &Interaction) -> PortResult<()>;

    async fn count_interactions(
        &mut self,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<i64>;

    /// Persists the article's counters.
    async fn save_article(&mut self, article: &Article) -> PortResult<()>;

    async fn commit(self: Box<Self>) -> PortResult<()>;
}
