//! Tests of the HTTP API, driven through the router with `tower::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use drawboard::{AppState, router};
use drawboard_auth::{AuthConfig, AuthGateway, TokenService};
use drawboard_protocol::EventType;
use drawboard_session::{DocumentStore, EventArchive, MemoryStore};
use serde_json::{Value, json};
use tower::ServiceExt;

// =========================================================================
// Helpers
// =========================================================================

struct Fixture {
    store: MemoryStore,
    tokens: TokenService,
    app: Router,
}

fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let config = AuthConfig::with_secret("api-secret");
    let tokens = TokenService::new(&config);
    let gateway = AuthGateway::new(store.clone(), tokens.clone(), config);
    let app = router(AppState {
        gateway: Arc::new(gateway),
        archive: EventArchive::new(store.clone()),
    });
    Fixture { store, tokens, app }
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

async fn call(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        set_cookie,
        body,
    }
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// The raw token out of a `Set-Cookie: refresh-token=<raw>; ...` value.
fn refresh_token_of(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("refresh-token="))
        .expect("refresh-token cookie")
        .to_string()
}

async fn signup_and_signin(f: &Fixture) -> Reply {
    let signup = call(
        &f.app,
        post_json(
            "/signup",
            &json!({"name": "Ada", "email": "ada@example.com", "password": "hunter2!"}),
        ),
    )
    .await;
    assert_eq!(signup.status, StatusCode::CREATED);

    call(
        &f.app,
        post_json(
            "/signin",
            &json!({"email": "ada@example.com", "password": "hunter2!"}),
        ),
    )
    .await
}

fn refresh_request(access: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/refresh").header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("refresh-token={cookie}"));
    }
    builder
        .body(Body::from(json!({"auth-token": access}).to_string()))
        .unwrap()
}

fn events_request(bearer: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::post("/events").header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

// =========================================================================
// Signup
// =========================================================================

#[tokio::test]
async fn test_signup_returns_201_with_id() {
    let f = fixture();
    let reply = call(
        &f.app,
        post_json(
            "/signup",
            &json!({"name": "Ada", "email": "ada@example.com", "password": "hunter2!"}),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    let id = reply.body["id"].as_str().expect("id is a string");
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_signup_duplicate_email_is_409() {
    let f = fixture();
    let body = json!({"name": "Ada", "email": "ada@example.com", "password": "hunter2!"});
    assert_eq!(call(&f.app, post_json("/signup", &body)).await.status, StatusCode::CREATED);

    let again = json!({"name": "Ada", "email": "ADA@example.com ", "password": "other-pw"});
    let reply = call(&f.app, post_json("/signup", &again)).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert!(reply.body["error"].is_string());
}

#[tokio::test]
async fn test_signup_invalid_email_is_400() {
    let f = fixture();
    let body = json!({"name": "Ada", "email": "not-an-email", "password": "hunter2!"});
    let reply = call(&f.app, post_json("/signup", &body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_malformed_body_is_400_with_error_shape() {
    let f = fixture();
    let request = Request::post("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = call(&f.app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].is_string());
}

// =========================================================================
// Signin
// =========================================================================

#[tokio::test]
async fn test_signin_sets_cookie_and_returns_tokens() {
    let f = fixture();
    let reply = signup_and_signin(&f).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Sign in successful.");
    assert_eq!(reply.body["user"]["email"], "ada@example.com");
    assert!(reply.body["user"].get("password_hash").is_none());

    let access = reply.body["auth-token"].as_str().unwrap();
    let verified = f.tokens.verify_access_token(access).unwrap();
    assert_eq!(reply.body["user"]["id"], verified.subject.as_str());
    assert_eq!(reply.body["auth-expiry-at"], verified.expires_at.timestamp());

    let cookie = reply.set_cookie.expect("signin sets a cookie");
    assert!(cookie.starts_with("refresh-token="));
    for attribute in ["HttpOnly", "Secure", "SameSite=Strict", "Path=/;", "Expires="] {
        assert!(cookie.contains(attribute), "missing {attribute} in {cookie}");
    }
}

#[tokio::test]
async fn test_signin_wrong_password_is_401() {
    let f = fixture();
    signup_and_signin(&f).await;

    let body = json!({"email": "ada@example.com", "password": "wrong"});
    let reply = call(&f.app, post_json("/signin", &body)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "invalid email or password");
    assert!(reply.set_cookie.is_none());
}

#[tokio::test]
async fn test_signin_unknown_email_reads_the_same() {
    let f = fixture();
    let body = json!({"email": "nobody@example.com", "password": "whatever"});
    let reply = call(&f.app, post_json("/signin", &body)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "invalid email or password");
}

// =========================================================================
// Refresh
// =========================================================================

#[tokio::test]
async fn test_refresh_rotates_cookie() {
    let f = fixture();
    let signin = signup_and_signin(&f).await;
    let access = signin.body["auth-token"].as_str().unwrap().to_string();
    let old_cookie = refresh_token_of(&signin.set_cookie.unwrap());
    let user_id: uuid::Uuid = signin.body["user"]["id"].as_str().unwrap().parse().unwrap();

    let reply = call(&f.app, refresh_request(&access, Some(&old_cookie))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Token refreshed.");
    assert!(f.tokens.verify_access_token(reply.body["auth-token"].as_str().unwrap()).is_ok());

    let cookie = reply.set_cookie.expect("refresh sets a cookie");
    assert!(cookie.contains("Path=/refresh"));
    let new_cookie = refresh_token_of(&cookie);
    assert_ne!(new_cookie, old_cookie);
    assert_eq!(f.store.count_sessions(user_id).await.unwrap(), 1);

    // The old cookie is spent.
    let replay = call(&f.app, refresh_request(&access, Some(&old_cookie))).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_401() {
    let f = fixture();
    let signin = signup_and_signin(&f).await;
    let access = signin.body["auth-token"].as_str().unwrap();

    let reply = call(&f.app, refresh_request(access, None)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "unauthorized");
}

#[tokio::test]
async fn test_refresh_with_tampered_access_token_is_401() {
    let f = fixture();
    let signin = signup_and_signin(&f).await;
    let access = format!("{}x", signin.body["auth-token"].as_str().unwrap());
    let cookie = refresh_token_of(&signin.set_cookie.unwrap());

    let reply = call(&f.app, refresh_request(&access, Some(&cookie))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    // The untouched cookie still works with the real token.
    let real = signin.body["auth-token"].as_str().unwrap();
    let retry = call(&f.app, refresh_request(real, Some(&cookie))).await;
    assert_eq!(retry.status, StatusCode::OK);
}

// =========================================================================
// Event archive
// =========================================================================

#[tokio::test]
async fn test_events_archived_with_valid_token() {
    let f = fixture();
    let token = f
        .tokens
        .issue_access_token("u1", f.tokens.now() + chrono::Duration::minutes(5))
        .unwrap();
    let batch = json!([
        {"type": "objectDelete", "tool": "eraser", "data": {"index": 3}},
        {"type": "boardClear", "timestamp": 1700000000},
    ]);

    let reply = call(&f.app, events_request(Some(&token), &batch)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["archived"], 2);

    let stored = f.store.list_events().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].event_type, EventType::ObjectDelete);
    assert_eq!(stored[1].timestamp.as_deref(), Some("1700000000"));
}

#[tokio::test]
async fn test_events_with_bad_item_store_nothing() {
    let f = fixture();
    let token = f
        .tokens
        .issue_access_token("u1", f.tokens.now() + chrono::Duration::minutes(5))
        .unwrap();
    let batch = json!([
        {"type": "boardClear"},
        {"type": "bogus"},
    ]);

    let reply = call(&f.app, events_request(Some(&token), &batch)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let message = reply.body["error"].as_str().unwrap();
    assert!(message.starts_with("event 1:"), "got {message}");
    assert!(f.store.list_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_events_without_token_is_401() {
    let f = fixture();
    let reply = call(&f.app, events_request(None, &json!([{"type": "boardClear"}]))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(f.store.list_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_events_with_expired_token_is_401() {
    let f = fixture();
    let token = f
        .tokens
        .issue_access_token("u1", f.tokens.now() - chrono::Duration::seconds(1))
        .unwrap();
    let reply = call(&f.app, events_request(Some(&token), &json!([]))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}
