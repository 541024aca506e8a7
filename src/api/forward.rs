//! The parameterized proxy core.
//!
//! Every resource route funnels through `forward`: one place owns bearer
//! attachment, the single retry after a token refresh, and backend error
//! translation. Resource routers only declare their path prefix and verbs.

use std::sync::Arc;

use axum::{
    Json,
    body::{Body, Bytes},
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::debug;

use super::error::{ApiError, ResultExt};
use crate::auth::Session;
use crate::backend::BackendClient;
use crate::refresh::refresh_session;
use crate::session::SessionCodec;

/// Largest request body the proxy will read (file uploads included).
pub(crate) const BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Shared context for proxied routes.
#[derive(Clone)]
pub struct ProxyState {
    pub backend: BackendClient,
    pub codec: Arc<SessionCodec>,
    pub secure_cookies: bool,
}

/// Collect a request body, bounded by the proxy body limit.
pub async fn read_body(body: Body) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|_| ApiError::bad_request("Request body too large"))
}

/// Forward one client request to the backend.
///
/// Attaches the session's bearer token, retries exactly once after a
/// successful refresh when the backend answers 401, and translates backend
/// error bodies into client-facing JSON. At most two backend calls happen,
/// strictly in sequence.
pub async fn forward(
    state: &ProxyState,
    session: &Session,
    method: &Method,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if session.access.is_empty() {
        return Err(ApiError::unauthorized("Not authenticated"));
    }

    let mut target = normalize_path(method, path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    let url = state.backend.url(&target);

    let backend_method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .internal_err("Unsupported method")?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // JSON bodies are parsed and re-serialized; anything else (multipart
    // uploads included) goes through byte-identical with its content type.
    let body = if is_json(content_type.as_deref()) && !body.is_empty() {
        let value: Value = serde_json::from_slice(&body)
            .map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
        Bytes::from(serde_json::to_vec(&value).internal_err("Failed to serialize body")?)
    } else {
        body
    };

    let mut response = send(
        state.backend.http(),
        backend_method.clone(),
        &url,
        &session.access,
        content_type.as_deref(),
        &body,
    )
    .await
    .internal_err("Backend request failed")?;

    // Expired access token: refresh once and re-issue the same request with
    // the new bearer. A failed refresh falls through to the 401 passthrough.
    if response.status().as_u16() == 401 && !session.refresh.is_empty() {
        if let Some(access) =
            refresh_session(&state.backend, &state.codec, session, state.secure_cookies).await
        {
            response = send(
                state.backend.http(),
                backend_method,
                &url,
                &access,
                content_type.as_deref(),
                &body,
            )
            .await
            .internal_err("Backend request failed")?;
        }
    }

    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    debug!(method = %method, path = %target, status = %status, "Proxied backend request");

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let body =
            serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "detail": text }));
        return Ok((status, Json(body)).into_response());
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let bytes = response
        .bytes()
        .await
        .internal_err("Failed to read backend response")?;
    if bytes.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let value: Value =
        serde_json::from_slice(&bytes).internal_err("Backend returned malformed JSON")?;
    Ok((status, Json(value)).into_response())
}

async fn send(
    http: &reqwest::Client,
    method: reqwest::Method,
    url: &str,
    bearer: &str,
    content_type: Option<&str>,
    body: &Bytes,
) -> Result<reqwest::Response, reqwest::Error> {
    let mut request = http
        .request(method, url)
        .header("authorization", format!("Bearer {}", bearer));

    if !body.is_empty() {
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        request = request.body(body.clone());
    }

    request.send().await
}

/// The backend expects a trailing slash on mutating endpoints.
fn normalize_path(method: &Method, path: &str) -> String {
    if *method != Method::GET && !path.ends_with('/') {
        format!("{}/", path)
    } else {
        path.to_string()
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("application/json"))
}
