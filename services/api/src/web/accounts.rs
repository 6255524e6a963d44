//! services/api/src/web/accounts.rs
//!
//! Account registration. Credentials are handled by the upstream gateway, so
//! this only provisions the account and its category preferences.

use axum::{extract::State, http::StatusCode, Json};
use echo_core::{accounts::register, NewUser, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::respond::JsonBody;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Categories picked at sign-up; they become the user's preferences.
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /register - Create a new account
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Malformed body, missing fields or username/email already in use", body = ErrorBody),
        (status = 409, description = "Concurrent registration won the race", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = register(
        state.db.as_ref(),
        NewUser {
            username: req.username,
            email: req.email,
            display_name: req.display_name,
            category_ids: req.category_ids,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}
