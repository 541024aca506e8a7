//! Axum extractors for session verification.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use super::cookie::{SESSION_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasSessionState;
use super::types::Session;
use crate::session::{SessionCodec, unix_now};

/// Core verification shared by the API extractor and the route gate.
///
/// Cookie present, token verifies, identity fields populated, session-level
/// expiry not passed. Returns the session on success; the caller decides how
/// a failure is surfaced (JSON 401 vs redirect).
pub fn session_from_headers(
    headers: &HeaderMap,
    codec: &SessionCodec,
) -> Result<Session, AuthErrorKind> {
    let token = get_cookie(headers, SESSION_COOKIE_NAME).ok_or(AuthErrorKind::NoSession)?;

    let session = codec.decode(token).ok_or(AuthErrorKind::InvalidSession)?;

    if session.user_id.is_empty() || session.expires == 0 {
        return Err(AuthErrorKind::InvalidSession);
    }

    // Fail closed if the clock is unreadable
    let now = unix_now().unwrap_or(u64::MAX);
    if now >= session.expires {
        return Err(AuthErrorKind::SessionExpired);
    }

    Ok(session)
}

/// Extractor for API endpoints that require a session.
/// Rejects with a JSON 401 (never a redirect) so JSON clients keep a
/// structured contract.
pub struct ApiSession(pub Session);

impl<S> FromRequestParts<S> for ApiSession
where
    S: HasSessionState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers, state.codec())
            .map(ApiSession)
            .map_err(|kind| ApiAuthError::new(kind, state.secure_cookies()))
    }
}
