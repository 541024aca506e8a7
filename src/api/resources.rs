//! Proxied resource routes.
//!
//! Each resource is a declaration: backend path prefix plus allowed verbs.
//! All request handling lives in the forwarding core.

use axum::{
    Router,
    extract::{Path, Request, State},
    response::Response,
    routing::post,
};

use super::error::ApiError;
use super::forward::{ProxyState, forward, read_body};
use crate::auth::{ApiSession, HasSessionState};
use crate::session::SessionCodec;

pub const FULL_METHODS: &[&str] = &["GET", "POST", "PATCH", "PUT", "DELETE"];
pub const GROUP_METHODS: &[&str] = &["GET", "POST", "PATCH", "DELETE"];
pub const ENTRY_METHODS: &[&str] = &["GET", "POST", "PATCH", "DELETE"];
pub const PROFILE_METHODS: &[&str] = &["GET", "PATCH", "PUT"];

#[derive(Clone)]
pub struct ResourceState {
    pub proxy: ProxyState,
    pub prefix: &'static str,
    pub methods: &'static [&'static str],
}

impl HasSessionState for ResourceState {
    fn codec(&self) -> &SessionCodec {
        &self.proxy.codec
    }
    fn secure_cookies(&self) -> bool {
        self.proxy.secure_cookies
    }
}

/// Router proxying every path under a resource to the backend prefix.
pub fn resource_router(
    proxy: ProxyState,
    prefix: &'static str,
    methods: &'static [&'static str],
) -> Router {
    Router::new()
        .fallback(forward_resource)
        .with_state(ResourceState {
            proxy,
            prefix,
            methods,
        })
}

/// Groups carry one action whose client name differs from the backend's:
/// leaving a group posts to the backend's `quiting` action.
pub fn groups_router(proxy: ProxyState) -> Router {
    Router::new()
        .route("/{id}/leave", post(leave_group))
        .fallback(forward_resource)
        .with_state(ResourceState {
            proxy,
            prefix: "/groups",
            methods: GROUP_METHODS,
        })
}

async fn forward_resource(
    State(state): State<ResourceState>,
    ApiSession(session): ApiSession,
    request: Request,
) -> Result<Response, ApiError> {
    if !state.methods.contains(&request.method().as_str()) {
        return Err(ApiError::MethodNotAllowed);
    }

    let (parts, body) = request.into_parts();
    let body = read_body(body).await?;
    let path = format!("{}{}", state.prefix, parts.uri.path());

    forward(
        &state.proxy,
        &session,
        &parts.method,
        &path,
        parts.uri.query(),
        &parts.headers,
        body,
    )
    .await
}

async fn leave_group(
    State(state): State<ResourceState>,
    ApiSession(session): ApiSession,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body = read_body(body).await?;
    let path = format!("/groups/{}/quiting", id);

    forward(
        &state.proxy,
        &session,
        &parts.method,
        &path,
        parts.uri.query(),
        &parts.headers,
        body,
    )
    .await
}
