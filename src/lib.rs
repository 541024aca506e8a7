pub mod api;
pub mod auth;
pub mod backend;
pub mod cli;
pub mod db;
pub mod gate;
pub mod rate_limit;
pub mod refresh;
pub mod session;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use url::Url;

use api::create_api_router;
use backend::BackendClient;
use db::Database;
use gate::GateState;
use session::SessionCodec;

pub struct GatewayConfig {
    /// Base URL of the backend service
    pub backend_url: Url,
    /// Secret for signing session tokens
    pub session_secret: Vec<u8>,
    /// Database holding push subscriptions
    pub db: Database,
    /// Whether to set Secure flag on cookies (should be true behind HTTPS)
    pub secure_cookies: bool,
    /// Directory with the built frontend assets
    pub assets_dir: PathBuf,
    /// VAPID public key; push endpoints are mounted only when present
    pub vapid_public_key: Option<String>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &GatewayConfig) -> Router {
    let codec = Arc::new(SessionCodec::new(&config.session_secret));
    let backend = BackendClient::new(&config.backend_url);

    let api_router = create_api_router(
        backend,
        codec.clone(),
        config.db.clone(),
        config.secure_cookies,
        config.vapid_public_key.clone(),
    )
    .layer(middleware::from_fn(refresh::apply_session_cookie));

    // SPA assets: unknown page paths fall back to index.html, with the route
    // gate deciding who gets to see them.
    let index = config.assets_dir.join("index.html");
    let frontend = Router::new()
        .fallback_service(ServeDir::new(&config.assets_dir).fallback(ServeFile::new(index)))
        .layer(middleware::from_fn_with_state(
            GateState {
                codec: codec.clone(),
            },
            gate::route_gate,
        ));

    Router::new().nest("/api", api_router).merge(frontend)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: GatewayConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: GatewayConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
