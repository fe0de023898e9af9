//! Stream Authentication
//!
//! 1. Server sends `{"T":"success","msg":"connected"}`
//! 2. Client sends `{"action":"auth","key":"...","secret":"..."}`
//! 3. Server sends `{"T":"success","msg":"authenticated"}` or an error frame
//!
//! Alpaca closes connections that do not authenticate within 10 seconds.

use std::time::Duration;

use thiserror::Error;

use super::messages::{AuthRequest, ErrorMessage, SuccessKind, SuccessMessage};
use crate::infrastructure::config::Credentials;

/// Server-side authentication deadline.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// 401.
    #[error("not authenticated: must authenticate before making requests")]
    NotAuthenticated,

    /// 402.
    #[error("authentication failed: invalid API key or secret")]
    InvalidCredentials,

    /// 403.
    #[error("already authenticated: connection is already authenticated")]
    AlreadyAuthenticated,

    /// 404.
    #[error("authentication timeout: must authenticate within 10 seconds")]
    Timeout,

    /// 406.
    #[error("connection limit exceeded: too many concurrent connections")]
    ConnectionLimitExceeded,

    /// Any other code received before authentication.
    #[error("server error ({code}): {message}")]
    ServerError {
        /// Error code.
        code: i32,
        /// Error text.
        message: String,
    },
}

impl From<&ErrorMessage> for AuthError {
    fn from(err: &ErrorMessage) -> Self {
        match err.code {
            401 => Self::NotAuthenticated,
            402 => Self::InvalidCredentials,
            403 => Self::AlreadyAuthenticated,
            404 => Self::Timeout,
            406 => Self::ConnectionLimitExceeded,
            code => Self::ServerError {
                code,
                message: err.msg.clone(),
            },
        }
    }
}

/// Authentication progress on one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Waiting for the server greeting.
    #[default]
    Disconnected,
    /// Greeting received, auth not sent yet.
    Connected,
    /// Auth sent.
    Authenticating,
    /// Credentials accepted.
    Authenticated,
    /// Server rejected the connection.
    Failed,
}

/// What the connection loop should do after a success frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Send this auth request.
    SendAuth(AuthRequest),
    /// Authentication complete; subscribe now.
    Authenticated,
}

/// Authentication state machine for one connection.
#[derive(Debug)]
pub struct AuthHandler {
    credentials: Credentials,
    state: AuthState,
}

impl AuthHandler {
    /// Create a handler in the disconnected state.
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: AuthState::Disconnected,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Whether credentials have been accepted.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated)
    }

    /// Advance on a success frame.
    pub fn on_success(&mut self, msg: &SuccessMessage) -> AuthStep {
        match msg.msg {
            SuccessKind::Connected => {
                self.state = AuthState::Authenticating;
                AuthStep::SendAuth(AuthRequest::new(
                    self.credentials.api_key().to_string(),
                    self.credentials.api_secret().to_string(),
                ))
            }
            SuccessKind::Authenticated => {
                self.state = AuthState::Authenticated;
                AuthStep::Authenticated
            }
        }
    }

    /// Fail on an error frame received before authentication.
    pub fn on_error(&mut self, msg: &ErrorMessage) -> AuthError {
        self.state = AuthState::Failed;
        AuthError::from(msg)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn handler() -> AuthHandler {
        AuthHandler::new(Credentials::new("key".to_string(), "secret".to_string()))
    }

    #[test]
    fn connected_then_authenticated() {
        let mut h = handler();
        let step = h.on_success(&SuccessMessage {
            msg: SuccessKind::Connected,
        });
        let AuthStep::SendAuth(req) = step else {
            panic!("expected auth request");
        };
        assert_eq!(req.key, "key");
        assert_eq!(req.secret, "secret");
        assert_eq!(h.state(), AuthState::Authenticating);

        let step = h.on_success(&SuccessMessage {
            msg: SuccessKind::Authenticated,
        });
        assert_eq!(step, AuthStep::Authenticated);
        assert!(h.is_authenticated());
    }

    #[test_case(401, AuthError::NotAuthenticated ; "not authenticated")]
    #[test_case(402, AuthError::InvalidCredentials ; "invalid credentials")]
    #[test_case(403, AuthError::AlreadyAuthenticated ; "already authenticated")]
    #[test_case(404, AuthError::Timeout ; "timeout")]
    #[test_case(406, AuthError::ConnectionLimitExceeded ; "connection limit")]
    fn error_codes_map(code: i32, expected: AuthError) {
        let mut h = handler();
        let err = h.on_error(&ErrorMessage {
            code,
            msg: "x".to_string(),
        });
        assert_eq!(err, expected);
        assert_eq!(h.state(), AuthState::Failed);
    }

    #[test]
    fn other_codes_keep_message() {
        let err = AuthError::from(&ErrorMessage {
            code: 500,
            msg: "internal error".to_string(),
        });
        assert_eq!(err.to_string(), "server error (500): internal error");
    }
}
