//! Request and response types exchanged with the host runtime.
//!
//! The host buffers the request body before calling the pipeline, and supplies
//! path-template captures as a [`PathParams`] request extension.

use bytes::Bytes;
use daedalus_core::ErrorEnvelope;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use indexmap::IndexMap;

/// The HTTP request type accepted by the pipeline.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by the pipeline.
///
/// A `Full<Bytes>` body can be handed to hyper as-is.
pub type Response = http::Response<Full<Bytes>>;

/// Content type of JSON responses.
pub const APPLICATION_JSON: &str = "application/json";

/// Path-template captures, e.g. `{"id": "42"}` for `/users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(IndexMap<String, String>);

impl PathParams {
    /// Creates an empty set of captures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capture.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Looks up a capture.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterates captures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Returns `true` when there are no captures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Extension trait for building pipeline responses.
pub trait ResponseExt {
    /// A response with the given status and body, and no headers.
    fn with_body(status: StatusCode, body: Bytes) -> Response;

    /// A JSON response.
    fn json(status: StatusCode, body: &serde_json::Value) -> Response;

    /// An error envelope response.
    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, body: Bytes) -> Response {
        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status;
        response
    }

    fn json(status: StatusCode, body: &serde_json::Value) -> Response {
        let mut response = Self::with_body(status, Bytes::from(body.to_string()));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        response
    }

    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response {
        let body = serde_json::to_value(envelope).unwrap_or_else(|_| {
            serde_json::json!({
                "error": { "code": "INTERNAL_ERROR", "message": daedalus_core::INTERNAL_ERROR_MESSAGE },
                "correlationId": envelope.correlation_id,
            })
        });
        Self::json(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::ApiError;
    use http_body_util::BodyExt;

    #[test]
    fn test_path_params() {
        let params: PathParams = [("org", "acme"), ("id", "7")].into_iter().collect();
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("missing"), None);
        let names: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["org", "id"]);
        assert!(PathParams::new().is_empty());
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = Response::json(StatusCode::CREATED, &serde_json::json!({"id": 1}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_JSON);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_envelope_response() {
        let envelope = ApiError::not_found("gone").to_envelope("c-9");
        let response = Response::envelope(StatusCode::NOT_FOUND, &envelope);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["correlationId"], "c-9");
    }
}
