//! HTTP client for the upstream backend service.

use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Access/refresh pair issued by the backend token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Response from the backend token-refresh endpoint. The refresh token is
/// only present when the backend rotates it.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Thin client over the backend base URL.
///
/// No explicit timeouts are configured; requests run to whatever the network
/// layer allows, and each proxied request makes at most two sequential calls.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: String,
}

impl BackendClient {
    pub fn new(base: &Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute backend URL for a path (with optional query) starting with '/'.
    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base, path_and_query)
    }

    /// Exchange credentials for a token pair (`POST /auth/token/`).
    /// Returns the raw response so callers can pass backend rejections
    /// through unchanged.
    pub async fn obtain_tokens(
        &self,
        username: &str,
        password: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(self.url("/auth/token/"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
    }

    /// Exchange a refresh token for a new access token
    /// (`POST /auth/token/refresh/`).
    pub async fn refresh_tokens(&self, refresh: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(self.url("/auth/token/refresh/"))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
    }
}
