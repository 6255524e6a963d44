//! services/api/src/web/router.rs
//!
//! Assembles the HTTP routes, middleware and documentation into one `Router`.

use axum::{
    http::{header::ACCEPT, header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::web::{
    accounts::register_handler,
    middleware::{require_auth, resolve_user, USER_HEADER},
    notifications::{list_notifications_handler, mark_all_read_handler, mark_read_handler},
    rest::{
        article_detail_handler, dashboard_handler, feed_handler, like_handler,
        list_categories_handler, save_handler, toggle_interaction_handler, ApiDoc,
    },
    state::AppState,
};

/// Builds the complete application router for `app_state`.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(USER_HEADER),
            HeaderName::from_static("x-requested-with"),
        ]);

    // Public routes (anonymous callers allowed)
    let public_routes = Router::new()
        .route("/register", post(register_handler))
        .route("/categories", get(list_categories_handler))
        .route("/news", get(feed_handler))
        .route("/news/{id}", get(article_detail_handler));

    // Protected routes (a resolved user is required)
    let protected_routes = Router::new()
        .route("/news/{id}/like", post(like_handler))
        .route("/news/{id}/save", post(save_handler))
        .route(
            "/news/{id}/interactions/{kind}",
            post(toggle_interaction_handler),
        )
        .route("/dashboard", get(dashboard_handler))
        .route("/notifications", get(list_notifications_handler))
        .route("/notifications/read-all", post(mark_all_read_handler))
        .route("/notifications/{id}/read", post(mark_read_handler))
        .layer(axum_middleware::from_fn(require_auth));

    // Combine API routes; every request gets its caller resolved first.
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_user,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
