//! Request-level route gate for page routes.
//!
//! Classifies every non-API, non-asset path as public or protected and
//! redirects based on session state. The gate is stateless; each request is
//! judged on its own.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use crate::auth::session_from_headers;
use crate::session::SessionCodec;

/// Login entry point.
pub const LOGIN_PATH: &str = "/login";

/// Where authenticated users land.
pub const LANDING_PATH: &str = "/dashboard";

/// Paths reachable without a session.
const PUBLIC_PATHS: &[&str] = &["/login", "/register", "/offline"];

#[derive(Clone)]
pub struct GateState {
    pub codec: Arc<SessionCodec>,
}

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    PassThrough,
    Redirect(String),
}

/// Middleware applying the gate decision to page requests.
pub async fn route_gate(
    State(gate): State<GateState>,
    request: Request,
    next: Next,
) -> Response {
    let session_valid = session_from_headers(request.headers(), &gate.codec).is_ok();

    match gate_decision(request.uri(), session_valid) {
        GateOutcome::PassThrough => next.run(request).await,
        GateOutcome::Redirect(to) => Redirect::temporary(&to).into_response(),
    }
}

/// Decide pass-through vs redirect for one request.
///
/// A pure function of (path, query, session validity), so the whole matrix is
/// testable without a server. Protected paths resolve toward the login
/// redirect, public paths toward pass-through.
pub fn gate_decision(uri: &Uri, session_valid: bool) -> GateOutcome {
    let path = uri.path();

    // API calls and static assets are outside the gate's jurisdiction.
    if path == "/api" || path.starts_with("/api/") || is_asset_path(path) {
        return GateOutcome::PassThrough;
    }

    // Never loop: a login redirect that targets the login page itself.
    if path == LOGIN_PATH && return_to_param(uri.query()).as_deref() == Some(LOGIN_PATH) {
        return GateOutcome::Redirect(LOGIN_PATH.to_string());
    }

    if is_public(path) {
        if session_valid && path == LOGIN_PATH {
            return GateOutcome::Redirect(LANDING_PATH.to_string());
        }
        return GateOutcome::PassThrough;
    }

    if !session_valid {
        // The root path gets a bare login redirect; returnTo=/ is useless.
        if path == "/" {
            return GateOutcome::Redirect(LOGIN_PATH.to_string());
        }
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("returnTo", path)
            .finish();
        return GateOutcome::Redirect(format!("{}?{}", LOGIN_PATH, query));
    }

    GateOutcome::PassThrough
}

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS
        .iter()
        .any(|p| path == *p || (path.starts_with(p) && path.as_bytes().get(p.len()) == Some(&b'/')))
}

/// Asset requests: the asset mount points, plus any path whose last segment
/// carries an extension (manifest.json, favicon.ico, ...).
fn is_asset_path(path: &str) -> bool {
    if path.starts_with("/assets/") || path.starts_with("/icons/") {
        return true;
    }
    path.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
}

fn return_to_param(query: Option<&str>) -> Option<String> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "returnTo")
        .map(|(_, value)| value.into_owned())
}
