//! Business handler contract.
//!
//! A [`Handler`] receives a [`HandlerContext`] and produces a
//! [`HandlerResponse`] or an [`ApiError`](crate::ApiError). Any `async fn(HandlerContext) ->
//! ApiResult<HandlerResponse>` is a handler.
//!
//! # Example
//!
//! ```
//! use daedalus_core::{ApiResult, HandlerContext, HandlerResponse};
//! use serde_json::json;
//!
//! async fn get_me(ctx: HandlerContext) -> ApiResult<HandlerResponse> {
//!     let principal = ctx.require_principal()?;
//!     Ok(HandlerResponse::ok(json!({ "id": principal.subject_id })))
//! }
//! ```

use crate::context::HandlerContext;
use crate::error::ApiResult;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The business logic behind a route.
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    fn handle(&self, ctx: HandlerContext) -> BoxFuture<'static, ApiResult<HandlerResponse>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<HandlerResponse>> + Send + 'static,
{
    fn handle(&self, ctx: HandlerContext) -> BoxFuture<'static, ApiResult<HandlerResponse>> {
        Box::pin(self(ctx))
    }
}

/// Body of a [`HandlerResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No body.
    Empty,
    /// Structured body, rendered as JSON.
    Json(Value),
    /// Raw bytes, sent as-is.
    Raw(Bytes),
}

/// What a handler returns on success.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// Response status.
    pub status: StatusCode,
    /// Extra headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
}

impl HandlerResponse {
    /// A JSON response with the given status.
    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Json(body),
        }
    }

    /// A `200 OK` JSON response.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    /// A `201 Created` JSON response.
    #[must_use]
    pub fn created(body: Value) -> Self {
        Self::json(StatusCode::CREATED, body)
    }

    /// A `204 No Content` response.
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// A raw byte response.
    #[must_use]
    pub fn raw(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Raw(body.into()),
        }
    }

    /// Serializes `value` into a JSON response.
    pub fn serialize<T: Serialize>(status: StatusCode, value: &T) -> ApiResult<Self> {
        Ok(Self::json(status, serde_json::to_value(value)?))
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CorrelationId;
    use crate::error::{ApiError, ErrorCode};
    use serde_json::json;

    async fn echo(ctx: HandlerContext) -> ApiResult<HandlerResponse> {
        let body = ctx.body().cloned().unwrap_or(Value::Null);
        Ok(HandlerResponse::created(body))
    }

    async fn fail(_ctx: HandlerContext) -> ApiResult<HandlerResponse> {
        Err(ApiError::conflict("taken"))
    }

    #[tokio::test]
    async fn test_async_fn_is_a_handler() {
        let handler: Box<dyn Handler> = Box::new(echo);
        let ctx = HandlerContext::new(CorrelationId::new()).with_body(Some(json!({"a": 1})));
        let response = handler.handle(ctx).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, ResponseBody::Json(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let err = Handler::handle(&fail, HandlerContext::new(CorrelationId::new()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn test_builders() {
        let response = HandlerResponse::no_content().with_header(
            http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        );
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(response.body, ResponseBody::Empty);
        assert_eq!(response.headers["cache-control"], "no-store");

        #[derive(Serialize)]
        struct User {
            id: u32,
        }
        let response = HandlerResponse::serialize(StatusCode::OK, &User { id: 7 }).unwrap();
        assert_eq!(response.body, ResponseBody::Json(json!({"id": 7})));
    }
}
