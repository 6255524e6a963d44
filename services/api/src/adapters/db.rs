//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echo_core::domain::{
    Article, ArticleId, Category, CategoryId, FeedQuery, Interaction, InteractionKind, NewUser,
    Notification, NotificationId, Preference, User,
};
use echo_core::ports::{DatabaseService, InteractionTx, PortError, PortResult};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a driver error onto the port taxonomy. `missing` describes the row for
/// the not-found case.
fn port_error(e: sqlx::Error, missing: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(missing()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    display_name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            display_name: self.display_name,
        }
    }
}

#[derive(FromRow)]
struct CategoryRecord {
    id: i64,
    name: String,
}
impl CategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct ArticleRecord {
    id: i64,
    title: String,
    body: String,
    published_at: DateTime<Utc>,
    author_id: Option<Uuid>,
    category_id: Option<i64>,
    like_count: i64,
    save_count: i64,
}
impl ArticleRecord {
    fn to_domain(self) -> Article {
        Article {
            id: self.id,
            title: self.title,
            body: self.body,
            published_at: self.published_at,
            author_id: self.author_id,
            category_id: self.category_id,
            like_count: self.like_count,
            save_count: self.save_count,
        }
    }
}

const ARTICLE_COLUMNS: &str =
    "id, title, body, published_at, author_id, category_id, like_count, save_count";

#[derive(FromRow)]
struct InteractionRecord {
    id: i64,
    user_id: Uuid,
    article_id: i64,
    kind: String,
    created_at: DateTime<Utc>,
}
impl InteractionRecord {
    fn to_domain(self) -> PortResult<Interaction> {
        let kind = self.kind.parse::<InteractionKind>().map_err(|_| {
            PortError::Unexpected(format!("Stored interaction {} has kind '{}'", self.id, self.kind))
        })?;
        Ok(Interaction {
            id: self.id,
            user_id: self.user_id,
            article_id: self.article_id,
            kind,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct PreferenceRecord {
    user_id: Uuid,
    category_ids: Vec<i64>,
}
impl PreferenceRecord {
    fn to_domain(self) -> Preference {
        Preference {
            user_id: self.user_id,
            category_ids: self.category_ids,
        }
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: i64,
    user_id: Uuid,
    headline: String,
    article_id: Option<i64>,
    created_at: DateTime<Utc>,
    is_read: bool,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            user_id: self.user_id,
            headline: self.headline,
            article_id: self.article_id,
            created_at: self.created_at,
            read: self.is_read,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, display_name FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn username_taken(&self, username: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn email_taken(&self, email: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn create_user_with_preference(&self, new_user: &NewUser) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, email, display_name) VALUES ($1, $2, $3, $4) \
             RETURNING id, username, email, display_name",
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.display_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| port_error(e, || "User was not created".to_string()))?;

        sqlx::query("INSERT INTO preferences (user_id) VALUES ($1)")
            .bind(record.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        if !new_user.category_ids.is_empty() {
            sqlx::query(
                "INSERT INTO preference_categories (user_id, category_id) \
                 SELECT $1, id FROM categories WHERE id = ANY($2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(record.id)
            .bind(&new_user.category_ids)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_categories(&self) -> PortResult<Vec<Category>> {
        let records =
            sqlx::query_as::<_, CategoryRecord>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_categories(&self, ids: &[CategoryId]) -> PortResult<Vec<Category>> {
        let records = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name FROM categories WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_article(&self, article_id: ArticleId) -> PortResult<Article> {
        let sql = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        let record = sqlx::query_as::<_, ArticleRecord>(&sql)
            .bind(article_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, || format!("Article {} not found", article_id)))?;
        Ok(record.to_domain())
    }

    async fn list_articles(&self, query: &FeedQuery) -> PortResult<Vec<Article>> {
        let records = match query {
            FeedQuery::All => {
                let sql = format!(
                    "SELECT {} FROM articles ORDER BY published_at DESC, id DESC",
                    ARTICLE_COLUMNS
                );
                sqlx::query_as::<_, ArticleRecord>(&sql)
                    .fetch_all(&self.pool)
                    .await
            }
            FeedQuery::Categories(ids) => {
                let sql = format!(
                    "SELECT {} FROM articles WHERE category_id = ANY($1) \
                     ORDER BY published_at DESC, id DESC",
                    ARTICLE_COLUMNS
                );
                sqlx::query_as::<_, ArticleRecord>(&sql)
                    .bind(ids)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn has_interaction(
        &self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM interactions \
             WHERE user_id = $1 AND article_id = $2 AND kind = $3)",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn get_preference(&self, user_id: Uuid) -> PortResult<Option<Preference>> {
        let record = sqlx::query_as::<_, PreferenceRecord>(
            "SELECT p.user_id, \
                    COALESCE(ARRAY_AGG(pc.category_id ORDER BY pc.category_id) \
                             FILTER (WHERE pc.category_id IS NOT NULL), '{}'::BIGINT[]) AS category_ids \
             FROM preferences p \
             LEFT JOIN preference_categories pc ON pc.user_id = p.user_id \
             WHERE p.user_id = $1 \
             GROUP BY p.user_id",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn top_interest_categories(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<CategoryId>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT category_id FROM interest_history WHERE user_id = $1 \
             ORDER BY score DESC, category_id ASC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn begin_interaction(&self) -> PortResult<Box<dyn InteractionTx>> {
        let tx = self.pool.begin().await.map_err(unexpected)?;
        Ok(Box::new(PgInteractionTx { tx }))
    }

    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            "SELECT id, user_id, headline, article_id, created_at, is_read FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC, is_read ASC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_notification(
        &self,
        user_id: Uuid,
        notification_id: NotificationId,
    ) -> PortResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            "SELECT id, user_id, headline, article_id, created_at, is_read FROM notifications \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("Notification {} not found", notification_id)))?;
        Ok(record.to_domain())
    }

    async fn mark_notification_read(&self, notification_id: NotificationId) -> PortResult<()> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND is_read = FALSE")
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}

//=========================================================================================
// Interaction Transaction
//=========================================================================================

/// One toggle's transaction. `find_article` takes a row lock on the article,
/// which every other toggle on the same article then waits for.
struct PgInteractionTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InteractionTx for PgInteractionTx {
    async fn find_article(&mut self, article_id: ArticleId) -> PortResult<Article> {
        let sql = format!(
            "SELECT {} FROM articles WHERE id = $1 FOR UPDATE",
            ARTICLE_COLUMNS
        );
        let record = sqlx::query_as::<_, ArticleRecord>(&sql)
            .bind(article_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| port_error(e, || format!("Article {} not found", article_id)))?;
        Ok(record.to_domain())
    }

    async fn find_interaction(
        &mut self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<Option<Interaction>> {
        let record = sqlx::query_as::<_, InteractionRecord>(
            "SELECT id, user_id, article_id, kind, created_at FROM interactions \
             WHERE user_id = $1 AND article_id = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(kind.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn create_interaction(
        &mut self,
        user_id: Uuid,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<Interaction> {
        let inserted = sqlx::query_as::<_, InteractionRecord>(
            "INSERT INTO interactions (user_id, article_id, kind) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, article_id, kind) DO NOTHING \
             RETURNING id, user_id, article_id, kind, created_at",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(kind.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(unexpected)?;

        match inserted {
            Some(record) => record.to_domain(),
            None => self
                .find_interaction(user_id, article_id, kind)
                .await?
                .ok_or_else(|| {
                    PortError::Unexpected("Interaction vanished after conflict".to_string())
                }),
        }
    }

    async fn delete_interaction(&mut self, interaction: &Interaction) -> PortResult<()> {
        sqlx::query("DELETE FROM interactions WHERE id = $1")
            .bind(interaction.id)
            .execute(&mut *self.tx)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn count_interactions(
        &mut self,
        article_id: ArticleId,
        kind: InteractionKind,
    ) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM interactions WHERE article_id = $1 AND kind = $2",
        )
        .bind(article_id)
        .bind(kind.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(unexpected)
    }

    async fn save_article(&mut self, article: &Article) -> PortResult<()> {
        let result =
            sqlx::query("UPDATE articles SET like_count = $1, save_count = $2 WHERE id = $3")
                .bind(article.like_count)
                .bind(article.save_count)
                .bind(article.id)
                .execute(&mut *self.tx)
                .await
                .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Article {} not found",
                article.id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        self.tx.commit().await.map_err(unexpected)
    }
}
