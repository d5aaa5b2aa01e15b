//! Error types for the auth layer.

use drawboard_session::{SessionError, StoreError};

/// Failures from [`TokenService`](crate::TokenService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token couldn't be signed (empty secret, encoder failure).
    #[error("could not sign token: {0}")]
    Signing(String),

    /// Bad signature, wrong algorithm, wrong issuer, or not a JWT at all.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token verified but its `exp` has passed.
    #[error("token has expired")]
    ExpiredToken,

    /// The OS randomness source failed.
    #[error("randomness unavailable: {0}")]
    Entropy(String),
}

/// A password hash couldn't be produced or parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(pub String);

/// What the signup, signin, and refresh flows can fail with.
///
/// The messages are what clients see, so the variants that reach them
/// carry fixed text and never the underlying cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The request itself is unacceptable (empty name, bad email, ...).
    #[error("{0}")]
    Validation(String),

    /// The email is already registered.
    #[error("email already registered")]
    Conflict,

    /// Signin with an unknown email or a wrong password. Both cases
    /// read the same.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A token or refresh cookie was missing, invalid, or expired.
    #[error("unauthorized")]
    Unauthorized,

    /// A store or crypto failure. The string names the failed step and
    /// stays server-side.
    #[error("internal error during {0}")]
    Internal(String),
}

impl AuthError {
    /// Wraps an infrastructure failure, logging the cause at `error`.
    pub(crate) fn internal(step: &str, cause: impl std::fmt::Display) -> Self {
        tracing::error!(step, error = %cause, "auth operation failed");
        Self::Internal(step.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::internal("store access", err)
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) | SessionError::Stale(_) => Self::Unauthorized,
            SessionError::Store(e) => e.into(),
        }
    }
}
