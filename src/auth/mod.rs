//! Session cookie authentication.
//!
//! One signed cookie holds the user's identity plus the backend access and
//! refresh tokens. Verification has two faces over a shared core: the
//! `ApiSession` extractor answers failures with JSON 401s, the route gate
//! answers them with redirects.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{SESSION_COOKIE_NAME, clear_session_cookie, get_cookie, session_cookie};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{ApiSession, session_from_headers};
pub use state::HasSessionState;
pub use types::Session;
