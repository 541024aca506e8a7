//! Session value type.

/// A verified session: the user's identity bound to backend credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Backend user id
    pub user_id: String,
    /// Backend access token (bearer credential for proxied calls)
    pub access: String,
    /// Backend refresh token (exchanged for new access tokens)
    pub refresh: String,
    /// Session-level expiry (Unix timestamp)
    pub expires: u64,
}
