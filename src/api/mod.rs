mod auth;
mod error;
mod forward;
mod push;
mod resources;

use std::sync::Arc;

use axum::{Json, Router, extract::DefaultBodyLimit, http::StatusCode};
use serde_json::json;

use crate::backend::BackendClient;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;
use crate::session::SessionCodec;
use forward::ProxyState;

/// Create the API router.
pub fn create_api_router(
    backend: BackendClient,
    codec: Arc<SessionCodec>,
    db: Database,
    secure_cookies: bool,
    vapid_public_key: Option<String>,
) -> Router {
    let proxy = ProxyState {
        backend: backend.clone(),
        codec: codec.clone(),
        secure_cookies,
    };

    let auth_state = auth::AuthState {
        backend,
        codec: codec.clone(),
        secure_cookies,
        limits: Arc::new(RateLimitConfig::new()),
    };

    let mut router = Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/groups", resources::groups_router(proxy.clone()))
        .nest(
            "/workouts",
            resources::resource_router(proxy.clone(), "/workouts", resources::FULL_METHODS),
        )
        .nest(
            "/meals",
            resources::resource_router(proxy.clone(), "/meals", resources::FULL_METHODS),
        )
        .nest(
            "/profiles",
            resources::resource_router(proxy.clone(), "/profiles", resources::PROFILE_METHODS),
        )
        .nest(
            "/nutrition",
            resources::resource_router(proxy.clone(), "/nutrition", resources::ENTRY_METHODS),
        )
        .nest(
            "/v1",
            resources::resource_router(proxy, "/api/v1", resources::FULL_METHODS),
        );

    // Push endpoints exist only when the deployment carries a VAPID key.
    if let Some(public_key) = vapid_public_key {
        let push_state = push::PushState {
            db,
            codec,
            secure_cookies,
            public_key,
        };
        router = router.nest("/push", push::router(push_state));
    }

    router
        .fallback(api_not_found)
        .layer(DefaultBodyLimit::max(forward::BODY_LIMIT))
}

/// Unknown API paths answer JSON, not the SPA fallback.
async fn api_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found" })))
}
