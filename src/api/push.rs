//! Web-push subscription endpoints.
//!
//! Subscriptions live in the database keyed by user, so they survive process
//! restarts and multiple instances. Delivery itself is the backend's job;
//! the gateway stores endpoints and hands out the VAPID public key.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ResultExt};
use crate::auth::ApiSession;
use crate::db::Database;
use crate::session::SessionCodec;

#[derive(Clone)]
pub struct PushState {
    pub db: Database,
    pub codec: Arc<SessionCodec>,
    pub secure_cookies: bool,
    pub public_key: String,
}

crate::impl_has_session_state!(PushState);

pub fn router(state: PushState) -> Router {
    Router::new()
        .route("/key", get(public_key))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/subscription", get(current_subscription))
        .with_state(state)
}

#[derive(Deserialize)]
struct SubscriptionKeys {
    p256dh: String,
    auth: String,
}

#[derive(Deserialize)]
struct SubscribeRequest {
    endpoint: String,
    keys: SubscriptionKeys,
}

/// VAPID public key for the client's PushManager.subscribe call.
async fn public_key(State(state): State<PushState>) -> impl IntoResponse {
    Json(json!({ "publicKey": state.public_key }))
}

/// Save (or replace) the caller's push subscription.
async fn subscribe(
    State(state): State<PushState>,
    ApiSession(session): ApiSession,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.endpoint.is_empty() {
        return Err(ApiError::bad_request("Subscription endpoint cannot be empty"));
    }

    state
        .db
        .subscriptions()
        .upsert(
            &session.user_id,
            &request.endpoint,
            &request.keys.p256dh,
            &request.keys.auth,
        )
        .await
        .db_err("Failed to save subscription")?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

/// Drop the caller's push subscription, if any.
async fn unsubscribe(
    State(state): State<PushState>,
    ApiSession(session): ApiSession,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .subscriptions()
        .delete_by_user(&session.user_id)
        .await
        .db_err("Failed to delete subscription")?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "removed": removed })),
    ))
}

/// The caller's stored subscription.
async fn current_subscription(
    State(state): State<PushState>,
    ApiSession(session): ApiSession,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = state
        .db
        .subscriptions()
        .get_by_user(&session.user_id)
        .await
        .db_err("Failed to load subscription")?
        .ok_or_else(|| ApiError::not_found("No subscription"))?;

    Ok(Json(json!({
        "endpoint": subscription.endpoint,
        "keys": { "p256dh": subscription.p256dh, "auth": subscription.auth },
        "updated_at": subscription.updated_at,
    })))
}
