//! Access-token refresh and session cookie persistence.
//!
//! A refreshed session has to reach the client as a Set-Cookie header on
//! whatever response the proxied handler produces. The refresh helper stashes
//! the cookie in a task-local; `apply_session_cookie` (layered over the API
//! router) appends it to the outgoing response.

use std::cell::RefCell;

use axum::{
    extract::Request,
    http::{HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{Session, session_cookie};
use crate::backend::{BackendClient, RefreshResponse};
use crate::session::{SESSION_TTL_SECS, SessionCodec, unix_now};

tokio::task_local! {
    /// Task-local storage for the renewed session cookie.
    /// Set by `refresh_session`, drained by `apply_session_cookie`.
    pub static NEW_SESSION_COOKIE: RefCell<Option<String>>;
}

/// Response middleware that appends the renewed session cookie, if a refresh
/// happened while handling the request.
pub async fn apply_session_cookie(request: Request, next: Next) -> Response {
    NEW_SESSION_COOKIE
        .scope(RefCell::new(None), async move {
            let mut response = next.run(request).await;

            let cookie = NEW_SESSION_COOKIE.with(|cell| cell.borrow_mut().take());
            if let Some(cookie) = cookie {
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }

            response
        })
        .await
}

/// Exchange the session's refresh token for a new access token and persist
/// the renewed session into the cookie.
///
/// Returns the new access token, or `None` when the backend rejects the
/// refresh or answers without one — the caller must treat the session as
/// unusable for this request. Never fails louder than that.
pub async fn refresh_session(
    backend: &BackendClient,
    codec: &SessionCodec,
    session: &Session,
    secure_cookies: bool,
) -> Option<String> {
    let response = match backend.refresh_tokens(&session.refresh).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Token refresh request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        debug!(status = %response.status(), "Token refresh rejected");
        return None;
    }

    let body: RefreshResponse = response.json().await.ok()?;
    if body.access.is_empty() {
        return None;
    }

    let now = unix_now().ok()?;
    let renewed = Session {
        user_id: session.user_id.clone(),
        access: body.access.clone(),
        // Rotation policy keeps refresh tokens stable; take a rotated one if
        // the backend sends it.
        refresh: body.refresh.unwrap_or_else(|| session.refresh.clone()),
        expires: now + SESSION_TTL_SECS,
    };

    let token = match codec.encode(&renewed) {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Failed to encode renewed session");
            return None;
        }
    };

    let cookie = session_cookie(&token, secure_cookies);
    let _ = NEW_SESSION_COOKIE.try_with(|cell| {
        cell.borrow_mut().replace(cookie);
    });

    Some(body.access)
}
