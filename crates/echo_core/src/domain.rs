//! crates/echo_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

pub type CategoryId = i64;
pub type ArticleId = i64;
pub type NotificationId = i64;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl User {
    /// The name shown to the user, falling back to the username.
    pub fn greeting_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// The resolved caller of a core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentUser {
    Anonymous,
    Authenticated(User),
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            CurrentUser::Anonymous => None,
            CurrentUser::Authenticated(user) => Some(user),
        }
    }
}

// Input for registration
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub category_ids: Vec<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A published news item.
///
/// `like_count` and `save_count` cache the number of matching interaction
/// rows and are only written by the interaction toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<CategoryId>,
    pub like_count: i64,
    pub save_count: i64,
}

impl Article {
    pub fn set_counter(&mut self, kind: InteractionKind, value: i64) {
        match kind {
            InteractionKind::Like => self.like_count = value,
            InteractionKind::Save => self.save_count = value,
        }
    }
}

/// The two ways a user can mark an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionKind {
    Like,
    Save,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Save => "save",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(InteractionKind::Like),
            "save" => Ok(InteractionKind::Save),
            other => Err(PortError::InvalidArgument(format!(
                "unknown interaction kind '{}'",
                other
            ))),
        }
    }
}

/// A user's like or save of an article. At most one per (user, article, kind).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub id: i64,
    pub user_id: Uuid,
    pub article_id: ArticleId,
    pub kind: InteractionKind,
    pub created_at: DateTime<Utc>,
}

/// A user's explicitly chosen categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub user_id: Uuid,
    pub category_ids: Vec<CategoryId>,
}

/// Scored affinity between a user and a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestHistory {
    pub user_id: Uuid,
    pub category_id: CategoryId,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: Uuid,
    pub headline: String,
    pub article_id: Option<ArticleId>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// A restartable description of an article listing, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedQuery {
    All,
    /// Articles whose category is in the set. An empty set matches nothing.
    Categories(Vec<CategoryId>),
}

impl FeedQuery {
    pub fn matches(&self, article: &Article) -> bool {
        match self {
            FeedQuery::All => true,
            FeedQuery::Categories(ids) => article
                .category_id
                .map(|id| ids.contains(&id))
                .unwrap_or(false),
        }
    }
}

//=========================================================================================
// Operation Results
//=========================================================================================

/// Which direction a toggle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Added,
    Removed,
}

impl ToggleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleAction::Added => "added",
            ToggleAction::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub kind: InteractionKind,
    pub action: ToggleAction,
    pub new_state: bool,
    pub new_count: i64,
}
