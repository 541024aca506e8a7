//! Session state trait and macro.

use crate::session::SessionCodec;

/// Trait for router state types that can verify sessions.
pub trait HasSessionState {
    fn codec(&self) -> &SessionCodec;
    fn secure_cookies(&self) -> bool;
}

/// Implement `HasSessionState` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `codec: Arc<SessionCodec>`
/// - `secure_cookies: bool`
#[macro_export]
macro_rules! impl_has_session_state {
    ($state_type:ty) => {
        impl $crate::auth::HasSessionState for $state_type {
            fn codec(&self) -> &$crate::session::SessionCodec {
                &self.codec
            }
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
        }
    };
}
