//! End-to-end tests of the HTTP surface, run against the in-memory store.

use std::sync::Arc;

use api_lib::{config::Config, web::build_router, web::state::AppState};
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use echo_core::{memory::InMemoryStore, InteractionKind, User};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    store: InMemoryStore,
    router: Router,
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        db_max_connections: 1,
        cors_origin: "http://localhost:3000".to_string(),
    }
}

fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let app_state = Arc::new(AppState {
        db: Arc::new(store.clone()),
        config: Arc::new(test_config()),
    });
    TestApp {
        store,
        router: build_router(app_state).expect("router builds"),
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    json: Value,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            headers,
            json,
        }
    }

    async fn user(&self, name: &str) -> User {
        self.store
            .add_user(name, &format!("{}@example.com", name))
            .await
            .unwrap()
    }
}

fn get(uri: &str, user: Option<&User>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn ajax_post(uri: &str, user: &User) -> Request<Body> {
    Request::post(uri)
        .header("x-user-id", user.id.to_string())
        .header("x-requested-with", "XMLHttpRequest")
        .body(Body::empty())
        .unwrap()
}

fn browser_post(uri: &str, user: &User, referer: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header("x-user-id", user.id.to_string());
    if let Some(referer) = referer {
        builder = builder.header(header::REFERER, referer);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

//=========================================================================================
// Feed
//=========================================================================================

#[tokio::test]
async fn anonymous_feed_lists_everything_newest_first() {
    let app = setup();
    let base = Utc::now();
    app.store.publish("older", None, base).await;
    app.store
        .publish("newer", None, base + Duration::minutes(5))
        .await;

    let reply = app.send(get("/news", None)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["source"], "anonymous");
    assert_eq!(reply.json["articles"][0]["title"], "newer");
    assert_eq!(reply.json["articles"][1]["title"], "older");
}

#[tokio::test]
async fn feed_follows_preferences_for_signed_in_users() {
    let app = setup();
    let sports = app.store.add_category("Sports").await.unwrap();
    let tech = app.store.add_category("Tech").await.unwrap();
    let user = app.user("ana").await;
    app.store.set_preference(user.id, vec![tech.id]).await;
    app.store.publish("match", Some(sports.id), Utc::now()).await;
    app.store.publish("chips", Some(tech.id), Utc::now()).await;

    let reply = app.send(get("/news", Some(&user))).await;

    assert_eq!(reply.json["source"], "preferences");
    let articles = reply.json["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "chips");
}

#[tokio::test]
async fn unknown_or_malformed_user_header_is_unauthorized() {
    let app = setup();

    let unknown = Request::get("/news")
        .header("x-user-id", uuid::Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(unknown).await.status, StatusCode::UNAUTHORIZED);

    let malformed = Request::get("/news")
        .header("x-user-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(malformed).await.status, StatusCode::UNAUTHORIZED);
}

//=========================================================================================
// Interactions
//=========================================================================================

#[tokio::test]
async fn toggles_require_a_signed_in_user() {
    let app = setup();
    let article = app.store.publish("story", None, Utc::now()).await;

    let request = Request::post(format!("/news/{}/like", article.id))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status, StatusCode::UNAUTHORIZED);

    let ajax = Request::post(format!("/news/{}/like", article.id))
        .header("x-requested-with", "XMLHttpRequest")
        .body(Body::empty())
        .unwrap();
    let reply = app.send(ajax).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json["success"], false);
    assert_eq!(reply.json["error"], "Unauthorized");
}

#[tokio::test]
async fn unknown_user_header_gets_a_json_error_for_ajax() {
    let app = setup();
    let request = Request::get("/news")
        .header("x-user-id", uuid::Uuid::new_v4().to_string())
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();

    let reply = app.send(request).await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json["success"], false);
}

#[tokio::test]
async fn malformed_article_id_is_a_bad_request() {
    let app = setup();
    let user = app.user("ivo").await;

    let ajax = app.send(ajax_post("/news/abc/like", &user)).await;
    assert_eq!(ajax.status, StatusCode::BAD_REQUEST);
    assert_eq!(ajax.json["success"], false);

    let browser = app.send(browser_post("/news/abc/like", &user, None)).await;
    assert_eq!(browser.status, StatusCode::BAD_REQUEST);
    assert_eq!(browser.json, Value::Null);
}

#[tokio::test]
async fn ajax_like_returns_structured_result_and_keeps_counter_in_sync() {
    let app = setup();
    let article = app.store.publish("X", None, Utc::now()).await;
    for name in ["ana", "bruno"] {
        let fan = app.user(name).await;
        let reply = app
            .send(ajax_post(&format!("/news/{}/like", article.id), &fan))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
    }
    let v = app.user("vera").await;
    let uri = format!("/news/{}/like", article.id);

    let added = app.send(ajax_post(&uri, &v)).await;
    assert_eq!(
        added.json,
        json!({
            "success": true,
            "action": "added",
            "new_count": 3,
            "new_state": true,
            "kind": "like"
        })
    );

    let removed = app.send(ajax_post(&uri, &v)).await;
    assert_eq!(removed.json["action"], "removed");
    assert_eq!(removed.json["new_state"], false);
    assert_eq!(removed.json["new_count"], 2);
    assert_eq!(
        app.store
            .interaction_count(article.id, InteractionKind::Like)
            .await,
        2
    );
}

#[tokio::test]
async fn generic_toggle_route_parses_the_kind() {
    let app = setup();
    let article = app.store.publish("X", None, Utc::now()).await;
    let user = app.user("caio").await;

    let saved = app
        .send(ajax_post(
            &format!("/news/{}/interactions/SAVE", article.id),
            &user,
        ))
        .await;
    assert_eq!(saved.status, StatusCode::OK);
    assert_eq!(saved.json["kind"], "save");
    assert_eq!(saved.json["new_count"], 1);

    let invalid = app
        .send(ajax_post(
            &format!("/news/{}/interactions/share", article.id),
            &user,
        ))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json["success"], false);
}

#[tokio::test]
async fn browser_toggle_redirects_back() {
    let app = setup();
    let article = app.store.publish("X", None, Utc::now()).await;
    let user = app.user("dora").await;
    let uri = format!("/news/{}/save", article.id);

    let with_referer = app
        .send(browser_post(&uri, &user, Some("/news/feed-page")))
        .await;
    assert_eq!(with_referer.status, StatusCode::SEE_OTHER);
    assert_eq!(with_referer.headers[header::LOCATION], "/news/feed-page");

    let without_referer = app.send(browser_post(&uri, &user, None)).await;
    assert_eq!(without_referer.status, StatusCode::SEE_OTHER);
    assert_eq!(without_referer.headers[header::LOCATION], "/");
}

#[tokio::test]
async fn toggling_a_missing_article_is_not_found_for_both_client_kinds() {
    let app = setup();
    let user = app.user("eva").await;

    let ajax = app.send(ajax_post("/news/404/like", &user)).await;
    assert_eq!(ajax.status, StatusCode::NOT_FOUND);
    assert_eq!(ajax.json["success"], false);

    let browser = app.send(browser_post("/news/404/like", &user, None)).await;
    assert_eq!(browser.status, StatusCode::NOT_FOUND);
    assert_eq!(browser.json, Value::Null);
}

#[tokio::test]
async fn article_detail_shows_the_callers_state() {
    let app = setup();
    let article = app.store.publish("X", None, Utc::now()).await;
    let user = app.user("fabio").await;
    app.send(ajax_post(&format!("/news/{}/like", article.id), &user))
        .await;

    let mine = app
        .send(get(&format!("/news/{}", article.id), Some(&user)))
        .await;
    assert_eq!(mine.json["liked"], true);
    assert_eq!(mine.json["saved"], false);
    assert_eq!(mine.json["article"]["like_count"], 1);

    let anonymous = app.send(get(&format!("/news/{}", article.id), None)).await;
    assert_eq!(anonymous.json["liked"], false);

    let missing = app.send(get("/news/999", None)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

//=========================================================================================
// Accounts
//=========================================================================================

#[tokio::test]
async fn registration_then_dashboard() {
    let app = setup();
    let economy = app.store.add_category("Economy").await.unwrap();
    app.store
        .publish("rates", Some(economy.id), Utc::now())
        .await;

    let created = app
        .send(json_post(
            "/register",
            json!({
                "username": "teste",
                "email": "teste@example.com",
                "category_ids": [economy.id]
            }),
        ))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let user_id = created.json["user_id"].as_str().unwrap().to_string();

    let dashboard = app
        .send(
            Request::get("/dashboard")
                .header("x-user-id", user_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.json["name"], "teste");
    assert_eq!(dashboard.json["preferred_categories"][0]["name"], "Economy");
    assert_eq!(dashboard.json["feed"]["source"], "preferences");
    assert_eq!(dashboard.json["feed"]["articles"][0]["title"], "rates");
}

#[tokio::test]
async fn duplicate_registration_lists_every_problem() {
    let app = setup();
    app.user("maria").await;

    let reply = app
        .send(json_post(
            "/register",
            json!({ "username": "MARIA", "email": "maria@example.com" }),
        ))
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_registration_body_gets_a_json_error() {
    let app = setup();
    let request = Request::post("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": "))
        .unwrap();

    let reply = app.send(request).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json["success"], false);
}

#[tokio::test]
async fn off_site_referer_is_not_followed() {
    let app = setup();
    let article = app.store.publish("X", None, Utc::now()).await;
    let user = app.user("lia").await;

    let reply = app
        .send(browser_post(
            &format!("/news/{}/like", article.id),
            &user,
            Some("https://evil.example/phish"),
        ))
        .await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.headers[header::LOCATION], "/");
}

#[tokio::test]
async fn dashboard_requires_a_signed_in_user() {
    let app = setup();
    let reply = app.send(get("/dashboard", None)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

//=========================================================================================
// Notifications
//=========================================================================================

#[tokio::test]
async fn notifications_can_be_marked_read() {
    let app = setup();
    let user = app.user("oliver").await;
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(app.store.notify(user.id, &format!("news {}", i), None).await.id);
    }

    let inbox = app.send(get("/notifications", Some(&user))).await;
    assert_eq!(inbox.json["unread_count"], 3);

    let one = app
        .send(ajax_post(&format!("/notifications/{}/read", ids[0]), &user))
        .await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.json["read"], true);

    let all = app
        .send(browser_post(
            "/notifications/read-all",
            &user,
            Some("/somewhere-else"),
        ))
        .await;
    assert_eq!(all.status, StatusCode::SEE_OTHER);
    assert_eq!(all.headers[header::LOCATION], "/notifications");

    let again = app
        .send(ajax_post("/notifications/read-all", &user))
        .await;
    assert_eq!(again.json["updated"], 0);

    let inbox = app.send(get("/notifications", Some(&user))).await;
    assert_eq!(inbox.json["unread_count"], 0);
}

#[tokio::test]
async fn other_users_notifications_are_not_found() {
    let app = setup();
    let owner = app.user("owner").await;
    let other = app.user("other").await;
    let id = app.store.notify(owner.id, "private", None).await.id;

    let reply = app
        .send(ajax_post(&format!("/notifications/{}/read", id), &other))
        .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

//=========================================================================================
// Documentation
//=========================================================================================

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup();
    let reply = app.send(get("/api-docs/openapi.json", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.json["paths"]["/news/{id}/like"].is_object());
}
