//! Error types for the auth crate.

use daedalus_core::{ApiError, Role};
use thiserror::Error;

/// Result type for authentication and authorization.
pub type AuthResult<T> = Result<T, AuthError>;

/// Reasons a caller is rejected.
///
/// Messages are safe to show to clients: they never echo the token or the
/// signing secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No `Authorization` header.
    #[error("Missing bearer token")]
    MissingToken,

    /// Header present but not `Bearer <token>`, or the token is not a JWT.
    #[error("Malformed bearer token")]
    MalformedToken,

    /// Signature does not match the configured secret.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// `exp` is in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// `nbf` is in the future.
    #[error("Token is not yet valid")]
    TokenNotYetValid,

    /// A claim the principal is built from is absent or has the wrong type.
    #[error("Token is missing required claim '{0}'")]
    MissingClaim(String),

    /// `iss` does not match.
    #[error("Token issuer is not accepted")]
    InvalidIssuer,

    /// `aud` does not match.
    #[error("Token audience is not accepted")]
    InvalidAudience,

    /// The principal's role is not among the required roles.
    #[error("Role '{role}' is not permitted to perform this operation")]
    Forbidden {
        /// The principal's role.
        role: Role,
    },

    /// Token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Returns `true` when the error should be rendered as `FORBIDDEN`.
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden { .. } => ApiError::forbidden(err.to_string()),
            AuthError::Signing(_) => ApiError::unexpected(err),
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}
