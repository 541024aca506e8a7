#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

use repgate::auth::Session;
use repgate::db::Database;
use repgate::session::{SESSION_TTL_SECS, SessionCodec, unix_now};
use repgate::{GatewayConfig, create_app};

/// Signing secret for the gateway under test.
pub const TEST_SECRET: &[u8] = b"test-session-secret-0123456789abcdef";

/// Access token the stub backend accepts out of the box.
pub const INITIAL_ACCESS: &str = "valid-access";

/// Refresh token paired with the initial access token.
pub const INITIAL_REFRESH: &str = "refresh-1";

/// Access token the stub backend hands out (and accepts) after a refresh.
pub const REFRESHED_ACCESS: &str = "refreshed-access";

/// Password the stub backend's token endpoint accepts.
pub const GOOD_PASSWORD: &str = "correct-horse";

/// One request the stub backend saw on a resource path.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path_and_query: String,
    pub bearer: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Shared, inspectable state of the stub backend.
#[derive(Default)]
pub struct BackendState {
    /// The access token currently accepted on resource paths.
    pub valid_access: Mutex<String>,
    /// When set, the refresh endpoint rejects every exchange.
    pub fail_refresh: AtomicBool,
    pub token_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Refresh tokens presented to the refresh endpoint.
    pub refresh_tokens_seen: Mutex<Vec<String>>,
    pub resource_calls: Mutex<Vec<RecordedCall>>,
}

impl BackendState {
    pub fn resource_call_count(&self) -> usize {
        self.resource_calls.lock().unwrap().len()
    }

    pub fn resource_call(&self, index: usize) -> RecordedCall {
        self.resource_calls.lock().unwrap()[index].clone()
    }

    pub fn refresh_call_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

/// Backend access token shaped like a JWT whose payload carries `user_id`.
/// The signature is garbage; the gateway never verifies backend tokens.
pub fn fake_access_token(user_id: u64) -> String {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "token_type": "access", "user_id": user_id })
            .to_string()
            .as_bytes(),
    );
    format!("{}.{}.stub-signature", header, payload)
}

async fn token_endpoint(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);

    if body.get("password").and_then(Value::as_str) == Some(GOOD_PASSWORD) {
        let access = fake_access_token(7);
        *state.valid_access.lock().unwrap() = access.clone();
        (
            StatusCode::OK,
            Json(json!({ "access": access, "refresh": INITIAL_REFRESH })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        )
            .into_response()
    }
}

async fn refresh_endpoint(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(refresh) = body.get("refresh").and_then(Value::as_str) {
        state
            .refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh.to_string());
    }

    if state.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        )
            .into_response();
    }

    *state.valid_access.lock().unwrap() = REFRESHED_ACCESS.to_string();
    (StatusCode::OK, Json(json!({ "access": REFRESHED_ACCESS }))).into_response()
}

async fn resource_endpoint(State(state): State<Arc<BackendState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    let bearer = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let content_type = parts
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    state.resource_calls.lock().unwrap().push(RecordedCall {
        method: parts.method.to_string(),
        path_and_query,
        bearer: bearer.clone(),
        content_type,
        body: body.to_vec(),
    });

    let valid = state.valid_access.lock().unwrap().clone();
    if bearer.as_deref() != Some(valid.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Given token not valid for any token type" })),
        )
            .into_response();
    }

    let path = parts.uri.path();
    if path.contains("boom") {
        // Deliberately not JSON, to exercise the gateway's body wrapping
        return (StatusCode::BAD_REQUEST, "kaput").into_response();
    }
    if parts.method == Method::DELETE || path.ends_with("/quiting/") {
        return StatusCode::NO_CONTENT.into_response();
    }

    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}

/// Spawn the stub backend on a random port.
pub async fn spawn_backend() -> (Arc<BackendState>, SocketAddr) {
    let state = Arc::new(BackendState {
        valid_access: Mutex::new(INITIAL_ACCESS.to_string()),
        ..Default::default()
    });

    let app = Router::new()
        .route("/auth/token/", post(token_endpoint))
        .route("/auth/token/refresh/", post(refresh_endpoint))
        .fallback(resource_endpoint)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub backend");
    let addr = listener.local_addr().expect("stub backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (state, addr)
}

pub struct TestContext {
    pub app: Router,
    pub backend: Arc<BackendState>,
    pub db: Database,
    pub codec: SessionCodec,
    _assets: TempDir,
}

/// Gateway wired to a fresh stub backend, with push endpoints enabled.
pub async fn setup() -> TestContext {
    build(Some("test-vapid-public-key".to_string())).await
}

/// Same, but without a VAPID key (push endpoints absent).
pub async fn setup_without_push() -> TestContext {
    build(None).await
}

async fn build(vapid_public_key: Option<String>) -> TestContext {
    let (backend, addr) = spawn_backend().await;

    let db = Database::open(":memory:").await.expect("open database");

    let assets = tempfile::tempdir().expect("assets dir");
    std::fs::write(
        assets.path().join("index.html"),
        "<html><body>repgate app shell</body></html>",
    )
    .expect("write index.html");
    std::fs::write(assets.path().join("manifest.json"), r#"{"name":"repgate"}"#)
        .expect("write manifest.json");

    let config = GatewayConfig {
        backend_url: Url::parse(&format!("http://{}", addr)).expect("backend url"),
        session_secret: TEST_SECRET.to_vec(),
        db: db.clone(),
        secure_cookies: false,
        assets_dir: assets.path().to_path_buf(),
        vapid_public_key,
    };

    TestContext {
        app: create_app(&config),
        backend,
        db,
        codec: SessionCodec::new(TEST_SECRET),
        _assets: assets,
    }
}

/// Cookie header value for a freshly minted session for user 7.
pub fn session_cookie(codec: &SessionCodec, access: &str, refresh: &str) -> String {
    let session = Session {
        user_id: "7".to_string(),
        access: access.to_string(),
        refresh: refresh.to_string(),
        expires: unix_now().unwrap() + SESSION_TTL_SECS,
    };
    format!("session={}", codec.encode(&session).unwrap())
}

/// Cookie whose signature is valid but whose session-level expiry has passed.
pub fn expired_session_cookie(codec: &SessionCodec) -> String {
    let session = Session {
        user_id: "7".to_string(),
        access: INITIAL_ACCESS.to_string(),
        refresh: INITIAL_REFRESH.to_string(),
        expires: unix_now().unwrap() - 60,
    };
    format!("session={}", codec.encode(&session).unwrap())
}

/// Drive one request through the gateway router.
pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    cookie: Option<&str>,
    json_body: Option<Value>,
) -> Response {
    let mut builder = axum::http::Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    let request = match json_body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    app.clone().oneshot(request).await.expect("send request")
}

/// Like `send`, but with an arbitrary body and content type.
pub async fn send_raw(
    app: &Router,
    method: &str,
    path: &str,
    cookie: Option<&str>,
    content_type: &str,
    body: &[u8],
) -> Response {
    let mut builder = axum::http::Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", content_type);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    let request = builder.body(Body::from(body.to_vec())).expect("build request");
    app.clone().oneshot(request).await.expect("send request")
}

/// Parse a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body as JSON")
}

/// Raw response body bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

/// First Set-Cookie header on a response, if any.
pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Extract the session token out of a Set-Cookie header value.
pub fn cookie_token(set_cookie: &str) -> Option<String> {
    let rest = set_cookie.strip_prefix("session=")?;
    Some(rest.split(';').next().unwrap_or("").to_string())
}
