//! Session cookie parsing and construction.

use axum::http::header;

use crate::session::SESSION_TTL_SECS;

/// Cookie holding the signed session token.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Build the Set-Cookie value for a session token.
///
/// Deliberately not HttpOnly: the frontend reads the cookie to decide whether
/// a session exists before making API calls.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; SameSite=Lax; Path=/; Max-Age={}{}",
        SESSION_COOKIE_NAME, token, SESSION_TTL_SECS, secure
    )
}

/// Build the Set-Cookie value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; SameSite=Lax; Path=/; Max-Age=0{}",
        SESSION_COOKIE_NAME, secure
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc123"));

        assert_eq!(get_cookie(&headers, "session"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; session=abc123; theme=dark"),
        );

        assert_eq!(get_cookie(&headers, "session"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "theme"), Some("dark"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "session"), None);
    }

    #[test]
    fn test_get_cookie_no_header() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(get_cookie(&headers, "session"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  session = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "session"), Some("abc123"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", false);
        assert!(cookie.starts_with("session=tok;"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains(&format!("Max-Age={}", SESSION_TTL_SECS)));
        assert!(!cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));

        let cookie = session_cookie("tok", true);
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_session_cookie() {
        let cookie = clear_session_cookie(false);
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
