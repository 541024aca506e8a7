//! CLI argument parsing, validation, and startup helpers.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use url::Url;

use crate::GatewayConfig;
use crate::db::Database;

const MIN_SESSION_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "repgate",
    about = "Session gateway in front of the fitness backend"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8470")]
    pub port: u16,

    /// Base URL of the backend service
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: String,

    /// Public URL this gateway is reachable at; cookies are Secure when it is HTTPS
    #[arg(long, default_value = "http://localhost:8470")]
    pub public_url: String,

    /// Path to the SQLite database holding push subscriptions
    #[arg(short, long, default_value = "repgate.db")]
    pub database: String,

    /// Directory with the built frontend assets
    #[arg(long, default_value = "public")]
    pub assets: PathBuf,

    /// VAPID public key for web push. Push endpoints are disabled without it
    #[arg(long, env = "VAPID_PUBLIC_KEY")]
    pub vapid_public_key: Option<String>,

    /// Path to file containing the session secret. Prefer using SESSION_SECRET env var instead
    #[arg(long)]
    pub session_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the session secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_session_secret(session_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("SESSION_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("SESSION_SECRET") };
        secret
    } else if let Some(path) = session_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read session secret file");
                return None;
            }
        }
    } else {
        error!(
            "Session secret is required. Set SESSION_SECRET environment variable (recommended) or use --session-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_SESSION_SECRET_LENGTH {
        error!(
            "Session secret is shorter than {} characters. Use a longer secret",
            MIN_SESSION_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the backend base URL.
/// Returns None and logs an error if validation fails.
pub fn validate_backend_url(backend_url: &str) -> Option<Url> {
    let url = match Url::parse(backend_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %backend_url, error = %e, "Invalid backend URL");
            return None;
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        error!(url = %backend_url, "Backend URL must use http or https");
        return None;
    }

    Some(url)
}

/// Parse and validate the public URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_url(public_url: &str) -> Option<Url> {
    match Url::parse(public_url) {
        Ok(url) => Some(url),
        Err(e) => {
            error!(url = %public_url, error = %e, "Invalid public URL");
            None
        }
    }
}

/// Validate the optional VAPID public key: absent disables push endpoints,
/// present-but-blank is a configuration error (fatal, returns None).
pub fn validate_vapid_key(key: Option<String>) -> Option<Option<String>> {
    match key {
        Some(k) if k.trim().is_empty() => {
            error!("VAPID public key is set but empty");
            None
        }
        other => Some(other),
    }
}

/// Build GatewayConfig from validated arguments.
pub fn build_config(
    backend_url: Url,
    public_url: Url,
    session_secret: String,
    db: Database,
    assets_dir: PathBuf,
    vapid_public_key: Option<String>,
) -> GatewayConfig {
    let secure_cookies = public_url.scheme() == "https";

    GatewayConfig {
        backend_url,
        session_secret: session_secret.into_bytes(),
        db,
        secure_cookies,
        assets_dir,
        vapid_public_key,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
