//! Authentication error types.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use super::cookie::clear_session_cookie;

/// Internal auth error kind used by the core verification logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No session cookie on the request
    NoSession,
    /// Cookie present but the token did not verify, or required fields missing
    InvalidSession,
    /// Session-level expiry has passed
    SessionExpired,
}

impl AuthErrorKind {
    pub(super) fn message(self) -> &'static str {
        match self {
            AuthErrorKind::NoSession => "Not authenticated",
            AuthErrorKind::InvalidSession => "Invalid session",
            AuthErrorKind::SessionExpired => "Session expired",
        }
    }
}

/// API authentication error: responds 401 with a JSON body and clears the
/// session cookie, so an unusable session is not re-sent on later requests.
#[derive(Debug)]
pub struct ApiAuthError {
    kind: AuthErrorKind,
    secure_cookies: bool,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind, secure_cookies: bool) -> Self {
        Self {
            kind,
            secure_cookies,
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use axum::http::{HeaderValue, StatusCode};
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            detail: &'static str,
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                detail: self.kind.message(),
            }),
        )
            .into_response();

        let clear = clear_session_cookie(self.secure_cookies);
        if let Ok(value) = HeaderValue::from_str(&clear) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }

        response
    }
}
