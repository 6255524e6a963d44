//! services/api/src/web/notifications.rs

use axum::{
    extract::State,
    response::{Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use echo_core::{notifications, Notification, NotificationId, User};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::respond::{ClientKind, Failure, PathParam};
use crate::web::state::AppState;

/// Where browsers land after changing read state.
const INBOX_PATH: &str = "/notifications";

#[derive(Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: i64,
    pub headline: String,
    pub article_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            headline: n.headline,
            article_id: n.article_id,
            created_at: n.created_at,
            read: n.read,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct InboxResponse {
    pub unread_count: usize,
    pub notifications: Vec<NotificationResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub updated: u64,
}

/// The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Inbox", body = InboxResponse),
        (status = 401, description = "Not signed in")
    ),
    params(
        ("x-user-id" = uuid::Uuid, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn list_notifications_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<InboxResponse>, ApiError> {
    let inbox = notifications::inbox(app_state.db.as_ref(), &user).await?;
    Ok(Json(InboxResponse {
        unread_count: inbox.unread_count,
        notifications: inbox.notifications.into_iter().map(Into::into).collect(),
    }))
}

/// Mark one notification as read. Repeating the call is harmless.
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    responses(
        (status = 200, description = "Marked (Ajax)", body = NotificationResponse),
        (status = 303, description = "Marked (browser), redirect to the inbox"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Not one of the caller's notifications", body = ErrorBody)
    ),
    params(
        ("id" = i64, Path, description = "Notification id"),
        ("x-user-id" = uuid::Uuid, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn mark_read_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    client: ClientKind,
    PathParam(notification_id): PathParam<NotificationId>,
) -> Result<Response, Failure> {
    let notification = notifications::mark_read(app_state.db.as_ref(), &user, notification_id)
        .await
        .map_err(|e| client.fail(e))?;
    Ok(client.reply(NotificationResponse::from(notification), INBOX_PATH, true))
}

/// Mark every unread notification of the caller as read.
#[utoipa::path(
    post,
    path = "/notifications/read-all",
    responses(
        (status = 200, description = "Marked (Ajax)", body = MarkAllReadResponse),
        (status = 303, description = "Marked (browser), redirect to the inbox"),
        (status = 401, description = "Not signed in")
    ),
    params(
        ("x-user-id" = uuid::Uuid, Header, description = "The authenticated account, set by the gateway.")
    )
)]
pub async fn mark_all_read_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    client: ClientKind,
) -> Result<Response, Failure> {
    let updated = notifications::mark_all_read(app_state.db.as_ref(), &user)
        .await
        .map_err(|e| client.fail(e))?;
    Ok(client.reply(
        MarkAllReadResponse {
            success: true,
            updated,
        },
        INBOX_PATH,
        true,
    ))
}
