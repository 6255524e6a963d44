//! services/api/src/web/middleware.rs
//!
//! Resolves the caller of every request and guards the routes that need one.
//!
//! Authentication itself happens upstream: the gateway in front of this service
//! forwards the authenticated account's id in the `x-user-id` header.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use echo_core::{CurrentUser, PortError};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::web::respond::{ClientKind, Failure};
use crate::web::state::AppState;

pub const USER_HEADER: &str = "x-user-id";

/// Middleware that inserts a `CurrentUser` into the request extensions.
///
/// No header means an anonymous caller. A header that is malformed or names an
/// unknown account is rejected with 401 Unauthorized.
pub async fn resolve_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Failure> {
    let client = ClientKind::from_headers(req.headers());
    let current = match req.headers().get(USER_HEADER) {
        None => CurrentUser::Anonymous,
        Some(value) => {
            // 1. Parse the forwarded account id
            let user_id = value
                .to_str()
                .ok()
                .and_then(|v| Uuid::parse_str(v.trim()).ok())
                .ok_or_else(|| {
                    warn!("Rejected malformed {} header", USER_HEADER);
                    client.fail(PortError::Unauthorized)
                })?;

            // 2. Load the account
            let user = state.db.get_user(user_id).await.map_err(|e| match e {
                PortError::NotFound(_) => {
                    warn!(%user_id, "Rejected unknown user");
                    client.fail(PortError::Unauthorized)
                }
                other => {
                    error!("Failed to load user {}: {:?}", user_id, other);
                    client.fail(other)
                }
            })?;
            CurrentUser::Authenticated(user)
        }
    };

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// Middleware for protected routes. Rejects anonymous callers with 401 and
/// exposes the resolved `User` to handlers.
///
/// Must run inside `resolve_user`.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, Failure> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.user().cloned())
        .ok_or_else(|| ClientKind::from_headers(req.headers()).fail(PortError::Unauthorized))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
