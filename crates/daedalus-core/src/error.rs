//! Error model for request handling.
//!
//! Every failure the pipeline can produce is an [`ApiError`]. Each variant maps to
//! exactly one [`ErrorCode`], and each code maps to exactly one HTTP status:
//!
//! | `ErrorCode` | Status |
//! |---|---|
//! | `BAD_REQUEST` | 400 |
//! | `UNAUTHORIZED` | 401 |
//! | `FORBIDDEN` | 403 |
//! | `NOT_FOUND` | 404 |
//! | `CONFLICT` | 409 |
//! | `VALIDATION_ERROR` | 422 |
//! | `INTERNAL_ERROR` | 500 |
//!
//! Faults that are not part of the taxonomy are carried as [`ApiError::Unexpected`].
//! They render with a generic message; the underlying chain is only ever logged.

use crate::validate::Violation;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned to clients for faults outside the taxonomy.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request could not be understood (e.g. body is not JSON).
    BadRequest,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Authenticated, but not allowed.
    Forbidden,
    /// Resource does not exist.
    NotFound,
    /// Request conflicts with current state.
    Conflict,
    /// Input failed schema validation.
    ValidationError,
    /// Server-side fault.
    InternalError,
}

impl ErrorCode {
    /// All codes, in status order.
    pub const ALL: [ErrorCode; 7] = [
        Self::BadRequest,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::Conflict,
        Self::ValidationError,
        Self::InternalError,
    ];

    /// Returns the HTTP status this code is rendered with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Looks a code up by HTTP status.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.status() == status)
    }

    /// Short description used when documenting the code as a response.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::BadRequest => "Malformed request",
            Self::Unauthorized => "Missing or invalid credentials",
            Self::Forbidden => "Caller lacks a required role",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Request conflicts with current state",
            Self::ValidationError => "Request failed validation",
            Self::InternalError => "Internal server error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request-handling failure.
///
/// Handlers return these directly for known outcomes; anything else can be
/// converted with `?` through [`From<anyhow::Error>`] and ends up as
/// [`ApiError::Unexpected`].
///
/// # Example
///
/// ```
/// use daedalus_core::{ApiError, ErrorCode};
///
/// let err = ApiError::not_found_resource("user", "42");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request was malformed.
    #[error("{message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },

    /// Authentication failed.
    #[error("{message}")]
    Unauthorized {
        /// Human-readable error message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },

    /// Authorization denied.
    #[error("{message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },

    /// Resource not found.
    #[error("{message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The type of resource that was not found.
        resource_type: Option<String>,
        /// The identifier of the resource.
        resource_id: Option<String>,
        /// Structured details. Replaces the resource context when set.
        details: Option<serde_json::Value>,
    },

    /// Conflict with current state.
    #[error("{message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },

    /// One or more validation violations.
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Every violation found, in discovery order.
        violations: Vec<Violation>,
        /// Structured details. Replaces the violation list when set.
        details: Option<serde_json::Value>,
    },

    /// A deliberate internal error raised by a handler. Its message is rendered as-is.
    #[error("{message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },

    /// A fault outside the taxonomy. Rendered with [`INTERNAL_ERROR_MESSAGE`].
    #[error("unexpected fault: {0:#}")]
    Unexpected(anyhow::Error),
}

impl ApiError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details: None,
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            details: None,
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
            resource_id: None,
            details: None,
        }
    }

    /// Creates a not found error with resource context.
    #[must_use]
    pub fn not_found_resource(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{resource_type} with ID '{resource_id}' not found"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id),
            details: None,
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error from a list of violations.
    #[must_use]
    pub fn validation(violations: Vec<Violation>) -> Self {
        let message = match violations.len() {
            1 => "Request validation failed with 1 violation".to_string(),
            n => format!("Request validation failed with {n} violations"),
        };
        Self::Validation {
            message,
            violations,
            details: None,
        }
    }

    /// Creates an internal error whose message is shown to the client.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            details: None,
        }
    }

    /// Wraps an arbitrary fault.
    pub fn unexpected(source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected(source.into())
    }

    /// Attaches structured details, rendered verbatim in the envelope.
    ///
    /// `Unexpected` faults are returned unchanged: their envelope never
    /// carries details.
    #[must_use]
    pub fn with_details(mut self, value: serde_json::Value) -> Self {
        match &mut self {
            Self::BadRequest { details, .. }
            | Self::Unauthorized { details, .. }
            | Self::Forbidden { details, .. }
            | Self::NotFound { details, .. }
            | Self::Conflict { details, .. }
            | Self::Validation { details, .. }
            | Self::Internal { details, .. } => *details = Some(value),
            Self::Unexpected(_) => {}
        }
        self
    }

    /// Returns the stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::BadRequest { .. } => ErrorCode::BadRequest,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::Internal { .. } | Self::Unexpected(_) => ErrorCode::InternalError,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.code().status()
    }

    /// Returns `true` for faults outside the taxonomy.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }

    /// The message safe to show to a client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unexpected(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the violations carried by a validation error.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Converts this error to the serializable response envelope.
    #[must_use]
    pub fn to_envelope(&self, correlation_id: impl Into<String>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.code(),
                message: self.public_message(),
                details: self.details(),
            },
            correlation_id: correlation_id.into(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::BadRequest { details, .. }
            | Self::Unauthorized { details, .. }
            | Self::Forbidden { details, .. }
            | Self::Conflict { details, .. }
            | Self::Internal { details, .. } => details.clone(),
            Self::Validation {
                violations,
                details,
                ..
            } => details
                .clone()
                .or_else(|| serde_json::to_value(violations).ok()),
            Self::NotFound {
                resource_type,
                resource_id,
                details,
                ..
            } => details.clone().or_else(|| match (resource_type, resource_id) {
                (Some(rt), Some(rid)) => Some(serde_json::json!({
                    "resourceType": rt,
                    "resourceId": rid
                })),
                _ => None,
            }),
            Self::Unexpected(_) => None,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => Self::Unexpected(other),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(err.into())
    }
}

/// Error response body: `{ "error": {..}, "correlationId": ".." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// The error detail.
    pub error: ErrorDetail,
    /// Correlation identifier of the failed request.
    pub correlation_id: String,
}

/// The `error` member of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured details, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FieldPath;

    #[test]
    fn test_codes_map_to_statuses() {
        assert_eq!(ErrorCode::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ValidationError.status().as_u16(), 422);
        assert_eq!(ErrorCode::InternalError.status().as_u16(), 500);
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::ValidationError).unwrap();
        assert_eq!(json, "\"VALIDATION_ERROR\"");
        assert_eq!(ErrorCode::from_status(StatusCode::FORBIDDEN), Some(ErrorCode::Forbidden));
        assert_eq!(ErrorCode::from_status(StatusCode::IM_A_TEAPOT), None);
    }

    #[test]
    fn test_known_errors_keep_their_message() {
        let err = ApiError::internal("ledger is closed");
        let envelope = err.to_envelope("abc");
        assert_eq!(envelope.error.code, ErrorCode::InternalError);
        assert_eq!(envelope.error.message, "ledger is closed");
        assert_eq!(envelope.correlation_id, "abc");
    }

    #[test]
    fn test_unexpected_errors_hide_details() {
        let err = ApiError::from(anyhow::anyhow!("db password=hunter2 rejected"));
        assert!(err.is_unexpected());
        let envelope = err.to_envelope("abc");
        assert_eq!(envelope.error.message, INTERNAL_ERROR_MESSAGE);
        assert!(envelope.error.details.is_none());
        assert!(err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_anyhow_wrapping_api_error_is_unwrapped() {
        let wrapped: anyhow::Error = ApiError::conflict("already exists").into();
        let err = ApiError::from(wrapped);
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn test_validation_envelope_lists_violations() {
        let err = ApiError::validation(vec![
            Violation::new(FieldPath::root().key("email"), "email must be a valid email"),
            Violation::new(FieldPath::root().key("password"), "password is required"),
        ]);
        let json = serde_json::to_value(err.to_envelope("c-1")).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["correlationId"], "c-1");
        let details = json["error"]["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["path"], "email");
        assert_eq!(details[1]["message"], "password is required");
    }

    #[test]
    fn test_details_omitted_when_absent() {
        let json = serde_json::to_value(ApiError::forbidden("no").to_envelope("x")).unwrap();
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_with_details_kept_for_every_code() {
        let hint = serde_json::json!({"hint": 1});
        let errors = [
            ApiError::bad_request("bad"),
            ApiError::unauthorized("who"),
            ApiError::forbidden("no"),
            ApiError::not_found("gone"),
            ApiError::conflict("taken"),
            ApiError::validation(Vec::new()),
            ApiError::internal("ledger is closed"),
        ];
        for err in errors {
            let code = err.code();
            let envelope = err.with_details(hint.clone()).to_envelope("x");
            assert_eq!(envelope.error.code, code);
            assert_eq!(envelope.error.details.as_ref(), Some(&hint), "{code:?}");
        }
    }

    #[test]
    fn test_with_details_on_unexpected_stays_masked() {
        let err = ApiError::unexpected(anyhow::anyhow!("disk full"))
            .with_details(serde_json::json!({"path": "/var"}));
        assert!(err.to_envelope("x").error.details.is_none());
    }

    #[test]
    fn test_not_found_resource_details() {
        let envelope = ApiError::not_found_resource("User", "42").to_envelope("x");
        assert_eq!(
            envelope.error.details,
            Some(serde_json::json!({"resourceType": "User", "resourceId": "42"}))
        );
    }
}
