//! Error normalization.
//!
//! Every failure, whether raised by a stage or by the handler, leaves the
//! pipeline as the same envelope:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "VALIDATION_ERROR",
//!     "message": "Request validation failed with 2 violation(s)",
//!     "details": [{ "path": "email", "message": "email must be a valid email" }]
//!   },
//!   "correlationId": "0192f1c4-..."
//! }
//! ```
//!
//! Unexpected faults are logged with their cause and answered with a generic
//! message. Their internals never reach the client.

use crate::types::{Response, ResponseExt};
use daedalus_core::{ApiError, CorrelationId};
use daedalus_telemetry::log_request_error;

/// Turns an error into its envelope response.
#[must_use]
pub fn error_response(error: &ApiError, correlation_id: &CorrelationId) -> Response {
    if error.is_unexpected() {
        log_request_error!(correlation_id, error);
    }
    let envelope = error.to_envelope(correlation_id.as_str());
    Response::envelope(error.status_code(), &envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::validate::{FieldPath, Violation};
    use daedalus_core::INTERNAL_ERROR_MESSAGE;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_carries_violations() {
        let id = CorrelationId::from_inbound("c-1").unwrap();
        let error = ApiError::validation(vec![Violation::new(
            FieldPath::root().key("email"),
            "email must be a valid email",
        )]);
        let response = error_response(&error, &id);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"][0]["path"], "email");
        assert_eq!(json["correlationId"], "c-1");
    }

    #[tokio::test]
    async fn test_unexpected_fault_is_masked() {
        let id = CorrelationId::new();
        let error = ApiError::unexpected(anyhow::anyhow!("connection pool exhausted"));
        let response = error_response(&error, &id);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body(response).await;
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], INTERNAL_ERROR_MESSAGE);
        assert!(!json.to_string().contains("pool"));
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let id = CorrelationId::new();
        let response = error_response(&ApiError::forbidden("Insufficient role"), &id);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body(response).await;
        assert_eq!(json["error"]["message"], "Insufficient role");
        assert_eq!(json["correlationId"], id.as_str());
    }
}
