//! Body, query and path validation stages.
//!
//! Each stage validates one input against the route's schema and stores the
//! normalized value in the context. All violations are reported together as a
//! single `VALIDATION_ERROR`.
//!
//! Query strings and path captures arrive as text, so they are validated with
//! the coercing validator. A query key repeated in the query string becomes an
//! array.

use crate::context::MiddlewareContext;
use crate::stage::{Stage, StageKind};
use daedalus_core::{ApiError, Schema, Validator};
use daedalus_telemetry::redact::redact;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Stage that parses the body as JSON and validates it.
///
/// An empty body is validated as absent.
#[derive(Debug, Clone)]
pub struct BodyValidationStage {
    schema: Arc<Schema>,
}

impl BodyValidationStage {
    /// Creates a stage validating against `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

impl Stage for BodyValidationStage {
    fn kind(&self) -> StageKind {
        StageKind::BodyValidation
    }

    fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError> {
        let parsed = parse_body(ctx.raw_body())?;
        if let Some(body) = &parsed {
            tracing::trace!(
                correlation_id = %ctx.correlation_id(),
                body = %redact(body),
                "validating request body"
            );
        }
        let body = Validator::strict()
            .validate(&self.schema, parsed.as_ref())
            .into_result()?;
        ctx.set_body(body);
        Ok(())
    }
}

/// Stage that validates the query string.
#[derive(Debug, Clone)]
pub struct QueryValidationStage {
    schema: Arc<Schema>,
}

impl QueryValidationStage {
    /// Creates a stage validating against `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

impl Stage for QueryValidationStage {
    fn kind(&self) -> StageKind {
        StageKind::QueryValidation
    }

    fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError> {
        let query = query_object(ctx.raw_query())?;
        let query = Validator::coercing()
            .validate(&self.schema, Some(&query))
            .into_result()?;
        ctx.set_query(query);
        Ok(())
    }
}

/// Stage that validates path-template captures.
#[derive(Debug, Clone)]
pub struct PathValidationStage {
    schema: Arc<Schema>,
}

impl PathValidationStage {
    /// Creates a stage validating against `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

impl Stage for PathValidationStage {
    fn kind(&self) -> StageKind {
        StageKind::PathValidation
    }

    fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError> {
        let captures: Map<String, Value> = ctx
            .path_captures()
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        let params = Value::Object(captures);
        let params = Validator::coercing()
            .validate(&self.schema, Some(&params))
            .into_result()?;
        ctx.set_path_params(params);
        Ok(())
    }
}

/// Parses a JSON body. Blank bodies are absent.
pub fn parse_body(raw: &[u8]) -> Result<Option<Value>, ApiError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(raw).map(Some).map_err(|e| {
        ApiError::bad_request("Request body is not valid JSON").with_details(serde_json::json!({
            "line": e.line(),
            "column": e.column(),
        }))
    })
}

/// Decodes a query string into a JSON object of strings.
///
/// Keys that appear more than once collect into an array, in order.
pub fn query_object(raw: Option<&str>) -> Result<Value, ApiError> {
    let pairs: Vec<(String, String)> = match raw {
        Some(raw) => serde_urlencoded::from_str(raw)
            .map_err(|_| ApiError::bad_request("Query string is not valid"))?,
        None => Vec::new(),
    };

    let mut object = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match object.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                object.insert(key, value);
            }
        }
    }
    Ok(Value::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PathParams;
    use bytes::Bytes;
    use daedalus_core::schema::Format;
    use daedalus_core::ErrorCode;
    use serde_json::json;

    fn context(uri: &str, body: &'static [u8]) -> MiddlewareContext {
        let request = http::Request::builder()
            .uri(uri)
            .body(Bytes::from_static(body))
            .unwrap();
        MiddlewareContext::from_request(request)
    }

    fn login_schema() -> Arc<Schema> {
        Arc::new(Schema::object([
            ("email", Schema::string().format(Format::Email)),
            ("password", Schema::string().min(1.0)),
        ]))
    }

    #[test]
    fn test_body_violations_are_aggregated() {
        let mut ctx = context("/login", br#"{"email":"not-an-email"}"#);
        let err = BodyValidationStage::new(login_schema())
            .apply(&mut ctx)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let paths: Vec<_> = err.violations().iter().map(|v| v.path.to_string()).collect();
        assert_eq!(paths, vec!["email", "password"]);
        assert_eq!(err.violations()[1].message, "password is required");
    }

    #[test]
    fn test_valid_body_is_stored_normalized() {
        let mut ctx = context("/login", br#"{"email":"a@b.io","password":"x","extra":1}"#);
        BodyValidationStage::new(login_schema())
            .apply(&mut ctx)
            .unwrap();
        assert_eq!(ctx.body(), Some(&json!({"email": "a@b.io", "password": "x"})));
    }

    #[test]
    fn test_invalid_json_is_bad_request() {
        let mut ctx = context("/login", b"{not json");
        let err = BodyValidationStage::new(login_schema())
            .apply(&mut ctx)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn test_empty_body_is_absent() {
        let optional = Arc::new(Schema::empty_object().optional());
        let mut ctx = context("/x", b"  ");
        BodyValidationStage::new(optional).apply(&mut ctx).unwrap();
        assert!(ctx.body().is_none());

        let mut ctx = context("/x", b"");
        let err = BodyValidationStage::new(login_schema())
            .apply(&mut ctx)
            .unwrap_err();
        assert_eq!(err.violations()[0].message, "value is required");
    }

    #[test]
    fn test_query_is_coerced() {
        let schema = Arc::new(Schema::object([
            ("page", Schema::integer().min(1.0)),
            ("tag", Schema::array(Schema::string()).optional()),
        ]));
        let mut ctx = context("/items?page=3&tag=a&tag=b", b"");
        QueryValidationStage::new(schema).apply(&mut ctx).unwrap();
        assert_eq!(ctx.query(), Some(&json!({"page": 3, "tag": ["a", "b"]})));
    }

    #[test]
    fn test_missing_query_validates_as_empty_object() {
        let schema = Arc::new(Schema::object([("q", Schema::string().optional())]));
        let mut ctx = context("/search", b"");
        QueryValidationStage::new(schema).apply(&mut ctx).unwrap();
        assert_eq!(ctx.query(), Some(&json!({})));
    }

    #[test]
    fn test_query_violation() {
        let schema = Arc::new(Schema::object([("page", Schema::integer().min(1.0))]));
        let mut ctx = context("/items?page=0", b"");
        let err = QueryValidationStage::new(schema).apply(&mut ctx).unwrap_err();
        assert_eq!(err.violations()[0].path.to_string(), "page");
    }

    #[test]
    fn test_path_captures_are_validated() {
        let schema = Arc::new(Schema::object([("id", Schema::integer())]));
        let mut request = http::Request::builder()
            .uri("/users/12")
            .body(Bytes::new())
            .unwrap();
        request.extensions_mut().insert(PathParams::new().with("id", "12"));
        let mut ctx = MiddlewareContext::from_request(request);
        PathValidationStage::new(schema.clone()).apply(&mut ctx).unwrap();
        assert_eq!(ctx.path_params(), Some(&json!({"id": 12})));

        let mut request = http::Request::builder().body(Bytes::new()).unwrap();
        request.extensions_mut().insert(PathParams::new().with("id", "abc"));
        let mut ctx = MiddlewareContext::from_request(request);
        let err = PathValidationStage::new(schema).apply(&mut ctx).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_query_object_decoding() {
        assert_eq!(query_object(None).unwrap(), json!({}));
        assert_eq!(
            query_object(Some("a=1&b=x%20y&a=2&a=3")).unwrap(),
            json!({"a": ["1", "2", "3"], "b": "x y"})
        );
    }
}
