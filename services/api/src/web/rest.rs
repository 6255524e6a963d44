//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the news endpoints (feed, article detail,
//! like/save toggles, dashboard) and the master definition for the OpenAPI
//! specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::accounts::{self, RegisterRequest, UserResponse};
use crate::web::notifications::{
    self, InboxResponse, MarkAllReadResponse, NotificationResponse,
};
use crate::web::respond::{ClientKind, Failure, PathParam};
use crate::web::state::AppState;
use axum::{
    extract::State,
    response::{Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use echo_core::{
    accounts::dashboard, interaction::toggle, news::article_detail, recommend::recommend,
    Article, ArticleId, Category, CurrentUser, Feed, InteractionKind, ToggleOutcome, User,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::register_handler,
        list_categories_handler,
        feed_handler,
        article_detail_handler,
        like_handler,
        save_handler,
        toggle_interaction_handler,
        dashboard_handler,
        notifications::list_notifications_handler,
        notifications::mark_read_handler,
        notifications::mark_all_read_handler,
    ),
    components(
        schemas(
            RegisterRequest,
            UserResponse,
            CategoryResponse,
            ArticleResponse,
            FeedResponse,
            ArticleDetailResponse,
            ToggleResponse,
            DashboardResponse,
            NotificationResponse,
            InboxResponse,
            MarkAllReadResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "Echo API", description = "News feed, interactions and notifications.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema, PartialEq, Debug)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<i64>,
    pub like_count: i64,
    pub save_count: i64,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            body: article.body,
            published_at: article.published_at,
            author_id: article.author_id,
            category_id: article.category_id,
            like_count: article.like_count,
            save_count: article.save_count,
        }
    }
}

/// A recommended feed and the tier that produced it.
#[derive(Serialize, ToSchema)]
pub struct FeedResponse {
    /// One of `anonymous`, `preferences`, `interest_history`, `everything`.
    pub source: String,
    pub articles: Vec<ArticleResponse>,
}

impl From<Feed> for FeedResponse {
    fn from(feed: Feed) -> Self {
        Self {
            source: feed.source.as_str().to_string(),
            articles: feed.articles.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ArticleDetailResponse {
    pub article: ArticleResponse,
    pub liked: bool,
    pub saved: bool,
}

/// The payload sent to Ajax callers after a like/save toggle.
#[derive(Serialize, ToSchema)]
pub struct ToggleResponse {
    pub success: bool,
    /// `added` or `removed`.
    pub action: String,
    pub new_count: i64,
    pub new_state: bool,
    /// `like` or `save`.
    pub kind: String,
}

impl From<ToggleOutcome> for ToggleResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            success: true,
            action: outcome.action.as_str().to_string(),
            new_count: outcome.new_count,
            new_state: outcome.new_state,
            kind: outcome.kind.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub name: String,
    pub email: String,
    pub preferred_categories: Vec<CategoryResponse>,
    pub feed: FeedResponse,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every category, by name.
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "All categories", body = [CategoryResponse])
    )
)]
pub async fn list_categories_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = app_state.db.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// The recommended feed for the caller, newest first.
///
/// Anonymous callers get every article.
#[utoipa::path(
    get,
    path = "/news",
    responses(
        (status = 200, description = "Recommended articles", body = FeedResponse),
        (status = 401, description = "Unknown x-user-id")
    ),
    params(
        ("x-user-id" = Option<Uuid>, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn feed_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<FeedResponse>, ApiError> {
    let feed = recommend(app_state.db.as_ref(), &current).await?;
    Ok(Json(feed.into()))
}

/// A single article, with the caller's like/save state.
#[utoipa::path(
    get,
    path = "/news/{id}",
    responses(
        (status = 200, description = "The article", body = ArticleDetailResponse),
        (status = 400, description = "Malformed article id", body = ErrorBody),
        (status = 404, description = "No such article", body = ErrorBody)
    ),
    params(
        ("id" = i64, Path, description = "Article id"),
        ("x-user-id" = Option<Uuid>, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn article_detail_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    client: ClientKind,
    PathParam(article_id): PathParam<ArticleId>,
) -> Result<Json<ArticleDetailResponse>, Failure> {
    let view = article_detail(app_state.db.as_ref(), &current, article_id)
        .await
        .map_err(|e| client.fail(e))?;
    Ok(Json(ArticleDetailResponse {
        article: view.article.into(),
        liked: view.liked,
        saved: view.saved,
    }))
}

async fn toggle_and_reply(
    app_state: &AppState,
    user: &User,
    client: ClientKind,
    article_id: ArticleId,
    kind: InteractionKind,
) -> Result<Response, Failure> {
    let outcome = toggle(app_state.db.as_ref(), user, article_id, kind)
        .await
        .map_err(|e| client.fail(e))?;
    Ok(client.reply(ToggleResponse::from(outcome), "/", false))
}

/// Like or un-like an article.
///
/// Ajax callers receive a `ToggleResponse`; browsers are redirected back to the
/// referring page.
#[utoipa::path(
    post,
    path = "/news/{id}/like",
    responses(
        (status = 200, description = "Toggled (Ajax)", body = ToggleResponse),
        (status = 303, description = "Toggled (browser), redirect to referer"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such article", body = ErrorBody)
    ),
    params(
        ("id" = i64, Path, description = "Article id"),
        ("x-user-id" = Uuid, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn like_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    client: ClientKind,
    PathParam(article_id): PathParam<ArticleId>,
) -> Result<Response, Failure> {
    toggle_and_reply(&app_state, &user, client, article_id, InteractionKind::Like).await
}

/// Save or un-save an article.
#[utoipa::path(
    post,
    path = "/news/{id}/save",
    responses(
        (status = 200, description = "Toggled (Ajax)", body = ToggleResponse),
        (status = 303, description = "Toggled (browser), redirect to referer"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such article", body = ErrorBody)
    ),
    params(
        ("id" = i64, Path, description = "Article id"),
        ("x-user-id" = Uuid, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn save_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    client: ClientKind,
    PathParam(article_id): PathParam<ArticleId>,
) -> Result<Response, Failure> {
    toggle_and_reply(&app_state, &user, client, article_id, InteractionKind::Save).await
}

/// Toggle an interaction named in the path (`like` or `save`).
#[utoipa::path(
    post,
    path = "/news/{id}/interactions/{kind}",
    responses(
        (status = 200, description = "Toggled (Ajax)", body = ToggleResponse),
        (status = 303, description = "Toggled (browser), redirect to referer"),
        (status = 400, description = "Unknown interaction kind", body = ErrorBody),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such article", body = ErrorBody)
    ),
    params(
        ("id" = i64, Path, description = "Article id"),
        ("kind" = String, Path, description = "`like` or `save`"),
        ("x-user-id" = Uuid, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn toggle_interaction_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    client: ClientKind,
    PathParam((article_id, kind)): PathParam<(ArticleId, String)>,
) -> Result<Response, Failure> {
    let kind = kind
        .parse::<InteractionKind>()
        .map_err(|e| client.fail(e))?;
    toggle_and_reply(&app_state, &user, client, article_id, kind).await
}

/// The signed-in landing view: greeting, preferred categories and feed.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Not signed in")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn dashboard_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let view = dashboard(app_state.db.as_ref(), &user).await?;
    Ok(Json(DashboardResponse {
        name: view.name,
        email: view.email,
        preferred_categories: view
            .preferred_categories
            .into_iter()
            .map(Into::into)
            .collect(),
        feed: view.feed.into(),
    }))
}
