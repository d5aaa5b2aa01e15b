//! HTTP API: signup, signin, refresh, and event archiving.
//!
//! All four routes take JSON bodies and answer with JSON. Failures always
//! have the shape `{"error": "<message>"}`.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use drawboard_auth::{AuthError, AuthGateway, RefreshInput, SigninInput, SignupInput};
use drawboard_protocol::parse_event_value;
use drawboard_session::{DocumentStore, EventArchive};
use serde::Deserialize;
use serde_json::{Value, json};

/// Name of the cookie carrying the raw refresh token.
const REFRESH_COOKIE: &str = "refresh-token";

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState<S> {
    pub gateway: Arc<AuthGateway<S>>,
    pub archive: EventArchive<S>,
}

/// Builds the API router over `state`.
pub fn router<S: DocumentStore + Clone>(state: AppState<S>) -> Router {
    Router::new()
        .route("/signup", post(signup::<S>))
        .route("/signin", post(signin::<S>))
        .route("/refresh", post(refresh::<S>))
        .route("/events", post(archive_events::<S>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SignupBody {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct SigninBody {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshBody {
    #[serde(rename = "auth-token")]
    auth_token: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error on its way to the client.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, AuthError::Unauthorized.to_string())
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            AuthError::Conflict => Self::new(StatusCode::CONFLICT, err.to_string()),
            AuthError::InvalidCredentials | AuthError::Unauthorized => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            // Already logged with its cause; the client only gets a fixed line.
            AuthError::Internal(_) => Self::internal(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn signup<S: DocumentStore + Clone>(
    State(state): State<AppState<S>>,
    body: Result<Json<SignupBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let id = state
        .gateway
        .signup(SignupInput {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

async fn signin<S: DocumentStore + Clone>(
    State(state): State<AppState<S>>,
    body: Result<Json<SigninBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let out = state
        .gateway
        .signin(SigninInput {
            email: body.email,
            password: body.password,
        })
        .await?;

    let cookie = refresh_cookie(&out.refresh_token, out.refresh_expires_at, "/")?;
    let body = json!({
        "message": "Sign in successful.",
        "auth-token": out.access_token,
        "auth-expiry-at": out.access_expires_at.timestamp(),
        "user": out.user,
    });
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn refresh<S: DocumentStore + Clone>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Result<Json<RefreshBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let refresh_token = cookie_value(&headers, REFRESH_COOKIE)
        .filter(|token| !token.is_empty())
        .ok_or_else(ApiError::unauthorized)?;

    let out = state
        .gateway
        .refresh(RefreshInput {
            access_token: body.auth_token,
            refresh_token: refresh_token.to_string(),
        })
        .await?;

    let cookie = refresh_cookie(&out.refresh_token, out.refresh_expires_at, "/refresh")?;
    let body = json!({
        "message": "Token refreshed.",
        "auth-token": out.access_token,
        "auth-expiry-at": out.access_expires_at.timestamp(),
    });
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Validates a batch of drawing events and stores them.
///
/// The batch is all-or-nothing: the first event that doesn't parse is
/// reported by index and nothing is written.
async fn archive_events<S: DocumentStore + Clone>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).ok_or_else(ApiError::unauthorized)?;
    state
        .gateway
        .tokens()
        .verify_access_token(token)
        .map_err(|e| {
            tracing::debug!(error = %e, "event archive with unusable token");
            ApiError::unauthorized()
        })?;

    let Json(raw) = body?;
    let events = raw
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            parse_event_value(value).map_err(|e| {
                ApiError::new(StatusCode::BAD_REQUEST, format!("event {index}: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let archived = state.archive.archive(events).await.map_err(|e| {
        tracing::error!(error = %e, "event archive failed");
        ApiError::internal()
    })?;
    Ok((StatusCode::CREATED, Json(json!({ "archived": archived }))).into_response())
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Finds cookie `name` across every `Cookie` header.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Renders the `Set-Cookie` value for a refresh token.
fn refresh_cookie(
    token: &str,
    expires_at: DateTime<Utc>,
    path: &str,
) -> Result<HeaderValue, ApiError> {
    let value = format!(
        "{REFRESH_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; Path={path}; Expires={}",
        expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
    );
    HeaderValue::from_str(&value).map_err(|e| {
        tracing::error!(error = %e, "refresh cookie is not a valid header");
        ApiError::internal()
    })
}
