//! Session lifecycle endpoints.
//!
//! - POST `/login` - Exchange credentials for a session cookie
//! - POST `/logout` - Clear the session cookie
//! - GET `/session` - Current session info (auth-status probe for the client)

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{ApiSession, Session, clear_session_cookie, session_cookie};
use crate::backend::{BackendClient, TokenPair};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::session::{SESSION_TTL_SECS, SessionCodec, unix_now};

#[derive(Clone)]
pub struct AuthState {
    pub backend: BackendClient,
    pub codec: Arc<SessionCodec>,
    pub secure_cookies: bool,
    pub limits: Arc<RateLimitConfig>,
}

crate::impl_has_session_state!(AuthState);

pub fn router(state: AuthState) -> Router {
    let limits = state.limits.clone();
    Router::new()
        .route(
            "/login",
            post(login).layer(middleware::from_fn_with_state(limits, rate_limit_login)),
        )
        .route("/logout", post(logout))
        .route("/session", get(current_session))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// Log in against the backend token endpoint and establish a session.
/// Backend rejections pass through with their status and body.
async fn login(
    State(state): State<AuthState>,
    Json(creds): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let response = state
        .backend
        .obtain_tokens(&creds.username, &creds.password)
        .await
        .internal_err("Login request failed")?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let body =
            serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "detail": text }));
        return Ok((status, Json(body)).into_response());
    }

    let tokens: TokenPair = response
        .json()
        .await
        .internal_err("Malformed token response")?;

    let user_id = user_id_from_access(&tokens.access).ok_or_else(|| {
        error!("Backend access token carries no user_id claim");
        ApiError::internal("Internal server error")
    })?;

    let now = unix_now().internal_err("Clock error")?;
    let session = Session {
        user_id,
        access: tokens.access,
        refresh: tokens.refresh,
        expires: now + SESSION_TTL_SECS,
    };

    let token = state
        .codec
        .encode(&session)
        .internal_err("Failed to encode session")?;
    let cookie = session_cookie(&token, state.secure_cookies);

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(json!({ "user_id": session.user_id, "expires": session.expires })),
    )
        .into_response())
}

/// Clear the session cookie. The backend is not notified; its refresh token
/// simply stops being presented.
async fn logout(State(state): State<AuthState>) -> impl IntoResponse {
    let clear = clear_session_cookie(state.secure_cookies);
    (
        StatusCode::OK,
        [(SET_COOKIE, clear)],
        Json(json!({ "success": true })),
    )
}

/// Current session info. 401 when there is no usable session.
async fn current_session(ApiSession(session): ApiSession) -> impl IntoResponse {
    Json(json!({ "user_id": session.user_id, "expires": session.expires }))
}

/// Read the `user_id` claim from the backend access token's payload segment.
/// The backend holds that signing key, so the claim is read unverified; only
/// the identity is needed, authorization stays with the backend.
fn user_id_from_access(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    match claims.get("user_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
