//! Middleware context.
//!
//! The [`MiddlewareContext`] is the mutable state a request accumulates while
//! it moves through the stages. Once every stage has passed it is frozen into
//! a [`HandlerContext`] for the business handler.

use crate::types::{PathParams, Request};
use bytes::Bytes;
use daedalus_core::{CorrelationId, HandlerContext, Principal};
use http::{HeaderMap, Method};
use serde_json::Value;
use std::time::Instant;

/// Per-request state threaded through the pipeline stages.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use daedalus_middleware::context::MiddlewareContext;
/// use daedalus_middleware::types::PathParams;
///
/// let mut request = http::Request::builder()
///     .uri("/users/7?verbose=true")
///     .body(Bytes::new())
///     .unwrap();
/// request.extensions_mut().insert(PathParams::new().with("id", "7"));
///
/// let ctx = MiddlewareContext::from_request(request);
/// assert_eq!(ctx.path(), "/users/7");
/// assert_eq!(ctx.raw_query(), Some("verbose=true"));
/// assert_eq!(ctx.path_captures().get("id"), Some("7"));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    correlation_id: CorrelationId,
    method: Method,
    path: String,
    raw_query: Option<String>,
    headers: HeaderMap,
    path_captures: PathParams,
    raw_body: Bytes,
    principal: Option<Principal>,
    body: Option<Value>,
    query: Option<Value>,
    path_params: Option<Value>,
    started_at: Instant,
}

impl MiddlewareContext {
    /// Creates a context from an inbound request.
    ///
    /// A fresh correlation id is assigned; the correlation stage may replace it
    /// with the inbound one.
    #[must_use]
    pub fn from_request(request: Request) -> Self {
        let (mut parts, raw_body) = request.into_parts();
        let path_captures = parts.extensions.remove::<PathParams>().unwrap_or_default();
        Self {
            correlation_id: CorrelationId::new(),
            method: parts.method,
            path: parts.uri.path().to_string(),
            raw_query: parts.uri.query().map(ToString::to_string),
            headers: parts.headers,
            path_captures,
            raw_body,
            principal: None,
            body: None,
            query: None,
            path_params: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Sets the correlation id.
    ///
    /// This should only be called by the correlation stage.
    pub fn set_correlation_id(&mut self, correlation_id: CorrelationId) {
        self.correlation_id = correlation_id;
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, if any.
    #[must_use]
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid visible ASCII.
    #[must_use]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Path-template captures supplied by the host.
    #[must_use]
    pub fn path_captures(&self) -> &PathParams {
        &self.path_captures
    }

    /// Body bytes as received.
    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// The authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Sets the principal.
    ///
    /// This should only be called by the authentication stage.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    /// The validated body, if a body stage ran.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Stores the validated body.
    pub fn set_body(&mut self, body: Option<Value>) {
        self.body = body;
    }

    /// The validated query, if a query stage ran.
    #[must_use]
    pub fn query(&self) -> Option<&Value> {
        self.query.as_ref()
    }

    /// Stores the validated query.
    pub fn set_query(&mut self, query: Option<Value>) {
        self.query = query;
    }

    /// The validated path captures, if a path stage ran.
    #[must_use]
    pub fn path_params(&self) -> Option<&Value> {
        self.path_params.as_ref()
    }

    /// Stores the validated path captures.
    pub fn set_path_params(&mut self, path_params: Option<Value>) {
        self.path_params = path_params;
    }

    /// When the request entered the pipeline.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Freezes the context for the handler.
    #[must_use]
    pub fn into_handler_context(self) -> HandlerContext {
        HandlerContext::new(self.correlation_id)
            .with_request(self.method, self.path, self.headers)
            .with_principal(self.principal)
            .with_body(self.body)
            .with_query(self.query)
            .with_path_params(self.path_params)
            .with_raw_body(self.raw_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri("/orders?limit=5")
            .header("x-tenant", "acme")
            .body(Bytes::from_static(b"{\"qty\":1}"))
            .unwrap()
    }

    #[test]
    fn test_from_request() {
        let ctx = MiddlewareContext::from_request(request());
        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/orders");
        assert_eq!(ctx.raw_query(), Some("limit=5"));
        assert_eq!(ctx.header("x-tenant"), Some("acme"));
        assert!(ctx.path_captures().is_empty());
        assert_eq!(&ctx.raw_body()[..], b"{\"qty\":1}");
        assert!(ctx.principal().is_none());
    }

    #[test]
    fn test_into_handler_context_carries_everything() {
        let mut ctx = MiddlewareContext::from_request(request());
        let id = CorrelationId::from_inbound("corr-1").unwrap();
        ctx.set_correlation_id(id.clone());
        ctx.set_principal(Principal::new("u-1", "admin"));
        ctx.set_body(Some(json!({"qty": 1})));
        ctx.set_query(Some(json!({"limit": 5})));

        let handler_ctx = ctx.into_handler_context();
        assert_eq!(handler_ctx.correlation_id(), &id);
        assert_eq!(handler_ctx.method(), Method::POST);
        assert_eq!(handler_ctx.path(), "/orders");
        assert_eq!(handler_ctx.principal().unwrap().subject_id, "u-1");
        assert_eq!(handler_ctx.body(), Some(&json!({"qty": 1})));
        assert_eq!(handler_ctx.query(), Some(&json!({"limit": 5})));
        assert!(handler_ctx.path_params().is_none());
        assert_eq!(handler_ctx.headers()["x-tenant"], "acme");
    }
}
