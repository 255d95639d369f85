//! Per-request values handed to business handlers.

use crate::error::ApiError;
use crate::identity::Principal;
use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Maximum length of an inbound correlation id that is trusted as-is.
pub const MAX_CORRELATION_ID_LEN: usize = 128;

/// Identifier that ties together every log line and the response of one request.
///
/// Generated ids are UUID v7, so they sort by creation time.
///
/// # Example
///
/// ```
/// use daedalus_core::CorrelationId;
///
/// let inbound = CorrelationId::from_inbound("req-42").unwrap();
/// assert_eq!(inbound.as_str(), "req-42");
/// assert!(CorrelationId::from_inbound("bad id\n").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Accepts an id supplied by the caller.
    ///
    /// Returns `None` for empty or overlong values, or values containing
    /// anything other than visible ASCII.
    #[must_use]
    pub fn from_inbound(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= MAX_CORRELATION_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(value.to_string()))
    }

    /// The id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

/// The frozen view of a request that a handler receives.
///
/// Body, query and path values have already passed validation and been
/// normalized (unknown keys stripped, query strings coerced).
#[derive(Debug, Clone)]
pub struct HandlerContext {
    correlation_id: CorrelationId,
    method: Method,
    path: String,
    headers: HeaderMap,
    principal: Option<Principal>,
    body: Option<Value>,
    query: Option<Value>,
    path_params: Option<Value>,
    raw_body: Bytes,
}

impl HandlerContext {
    /// Creates a context with nothing but a correlation id.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            method: Method::GET,
            path: String::from("/"),
            headers: HeaderMap::new(),
            principal: None,
            body: None,
            query: None,
            path_params: None,
            raw_body: Bytes::new(),
        }
    }

    /// Sets the request line.
    #[must_use]
    pub fn with_request(mut self, method: Method, path: impl Into<String>, headers: HeaderMap) -> Self {
        self.method = method;
        self.path = path.into();
        self.headers = headers;
        self
    }

    /// Sets the authenticated principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    /// Sets the validated body.
    #[must_use]
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Sets the validated query.
    #[must_use]
    pub fn with_query(mut self, query: Option<Value>) -> Self {
        self.query = query;
        self
    }

    /// Sets the validated path captures.
    #[must_use]
    pub fn with_path_params(mut self, path_params: Option<Value>) -> Self {
        self.path_params = path_params;
        self
    }

    /// Sets the raw body bytes.
    #[must_use]
    pub fn with_raw_body(mut self, raw_body: Bytes) -> Self {
        self.raw_body = raw_body;
        self
    }

    /// The correlation id of this request.
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path (not the template).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The authenticated caller, if the route authenticates.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The authenticated caller, or `UNAUTHORIZED`.
    pub fn require_principal(&self) -> Result<&Principal, ApiError> {
        self.principal
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }

    /// The validated body.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The validated query.
    #[must_use]
    pub fn query(&self) -> Option<&Value> {
        self.query.as_ref()
    }

    /// The validated path captures.
    #[must_use]
    pub fn path_params(&self) -> Option<&Value> {
        self.path_params.as_ref()
    }

    /// The body exactly as received.
    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Deserializes the validated body.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        typed(self.body.as_ref())
    }

    /// Deserializes the validated query.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        typed(self.query.as_ref())
    }

    /// Deserializes the validated path captures.
    pub fn path_params_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        typed(self.path_params.as_ref())
    }
}

fn typed<T: DeserializeOwned>(value: Option<&Value>) -> Result<T, ApiError> {
    let value = value.cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(ApiError::from)
}
