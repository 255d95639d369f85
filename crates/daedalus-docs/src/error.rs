//! Error types for document generation.

use thiserror::Error;

/// Errors raised while compiling a document.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the document.
    #[error("failed to serialize OpenAPI document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A route names a security scheme that was never added.
    #[error("route {route} references unknown security scheme '{scheme}'")]
    UnknownSecurityScheme {
        /// The route, e.g. `GET /me`.
        route: String,
        /// The missing scheme name.
        scheme: String,
    },

    /// A route requires auth but no security scheme exists.
    #[error("route {route} requires authentication but no security scheme was added")]
    NoSecurityScheme {
        /// The route.
        route: String,
    },

    /// Multipart form fields must be described by an object.
    #[error("route {route} declares {kind} form fields; form fields must be an object")]
    FormFieldsNotObject {
        /// The route.
        route: String,
        /// Kind of the offending descriptor.
        kind: &'static str,
    },

    /// The method has no OpenAPI operation slot.
    #[error("route {route} uses method {method}, which OpenAPI cannot describe")]
    UnsupportedMethod {
        /// The route.
        route: String,
        /// The method.
        method: String,
    },
}

/// Result type for document generation.
pub type DocsResult<T> = Result<T, DocsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error() {
        let err: DocsError = serde_json::from_str::<String>("invalid").unwrap_err().into();
        assert!(matches!(err, DocsError::Serialization(_)));
        assert!(err.to_string().contains("serialize"));
    }

    #[test]
    fn test_messages_name_the_route() {
        let err = DocsError::UnknownSecurityScheme {
            route: "GET /me".to_string(),
            scheme: "apiKey".to_string(),
        };
        assert!(err.to_string().contains("GET /me"));
        assert!(err.to_string().contains("apiKey"));
    }
}
