//! Request-handling pipeline.
//!
//! A [`Pipeline`] serves exactly one route. It is assembled once at startup
//! from the route's registration and reused for every request:
//!
//! ```text
//! Request → Correlation → [Authentication] → [Authorization]
//!         → [Body] → [Query] → [Path] → Handler → Response
//!                     ↘ any failure → error envelope ↗
//! ```
//!
//! Stages run as an ordered list folded over one [`MiddlewareContext`]; the
//! first failing stage ends the request. Stages in brackets are only present
//! when the route needs them. Whatever happens, the response carries the
//! correlation header, and failures leave as an error envelope.

use crate::context::MiddlewareContext;
use crate::error::{PipelineError, PipelineResult};
use crate::stage::Stage;
use crate::stages::{
    error_response, AuthenticationStage, AuthorizationStage, BodyValidationStage,
    CorrelationStage, PathValidationStage, QueryValidationStage, CORRELATION_ID_HEADER,
};
use crate::types::{Request, Response, ResponseExt};
use bytes::Bytes;
use daedalus_auth::JwtConfig;
use daedalus_core::{ApiError, Handler, HandlerResponse, ResponseBody, RouteSpec};
use daedalus_telemetry::{log_request_complete, log_stage_rejected};
use futures_util::FutureExt;
use http::header::{HeaderName, HeaderValue};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Caller-supplied pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Header the correlation id is read from and echoed on.
    pub correlation_header: HeaderName,
    /// Whether an inbound correlation id is adopted.
    pub trust_incoming_correlation: bool,
    /// Whether the per-request access line is emitted.
    pub logging: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            correlation_header: HeaderName::from_static(CORRELATION_ID_HEADER),
            trust_incoming_correlation: true,
            logging: true,
        }
    }
}

/// A route's business handler wrapped in its stages.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use daedalus_core::{ApiResult, HandlerContext, HandlerResponse, RouteSpec};
/// use daedalus_middleware::Pipeline;
/// use serde_json::json;
///
/// async fn health(_ctx: HandlerContext) -> ApiResult<HandlerResponse> {
///     Ok(HandlerResponse::ok(json!({ "status": "ok" })))
/// }
///
/// let pipeline = Pipeline::builder(RouteSpec::get("/health")).build(health).unwrap();
/// assert_eq!(pipeline.stage_names(), vec!["correlation"]);
///
/// # tokio_test::block_on(async {
/// let request = http::Request::builder().uri("/health").body(Bytes::new()).unwrap();
/// let response = pipeline.handle(request).await;
/// assert_eq!(response.status(), 200);
/// assert!(response.headers().contains_key("x-correlation-id"));
/// # });
/// ```
pub struct Pipeline {
    route: Arc<RouteSpec>,
    stages: Vec<Box<dyn Stage>>,
    handler: Arc<dyn Handler>,
    options: PipelineOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("route", &self.route.key().to_string())
            .field("stages", &self.stage_names())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Starts building a pipeline for `route`.
    #[must_use]
    pub fn builder(route: impl Into<Arc<RouteSpec>>) -> PipelineBuilder {
        PipelineBuilder::new(route)
    }

    /// The route this pipeline serves.
    #[must_use]
    pub fn route(&self) -> &Arc<RouteSpec> {
        &self.route
    }

    /// Names of the assembled stages, in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs one request through the stages and the handler.
    ///
    /// Never fails: every error, including a handler panic, becomes an error
    /// envelope response.
    pub async fn handle(&self, request: Request) -> Response {
        let mut ctx = MiddlewareContext::from_request(request);
        let outcome = self.run_stages(&mut ctx);

        let correlation_id = ctx.correlation_id().clone();
        let method = ctx.method().clone();
        let path = ctx.path().to_string();
        let started_at = ctx.started_at();

        let mut response = match outcome {
            Ok(()) => self.invoke(ctx).await,
            Err(error) => error_response(&error, &correlation_id),
        };

        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            response
                .headers_mut()
                .insert(self.options.correlation_header.clone(), value);
        }

        if self.options.logging {
            log_request_complete!(
                correlation_id,
                method,
                path,
                response.status().as_u16(),
                millis(started_at.elapsed())
            );
        }
        response
    }

    fn run_stages(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError> {
        self.stages.iter().try_for_each(|stage| {
            stage.apply(ctx).map_err(|error| {
                log_stage_rejected!(ctx.correlation_id(), stage.name(), error.code());
                error
            })
        })
    }

    async fn invoke(&self, ctx: MiddlewareContext) -> Response {
        let correlation_id = ctx.correlation_id().clone();
        let handler_ctx = ctx.into_handler_context();
        let handler = Arc::clone(&self.handler);

        let result = AssertUnwindSafe(async move { handler.handle(handler_ctx).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ApiError::unexpected(anyhow::anyhow!(
                    "handler panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        match result {
            Ok(handler_response) => into_response(handler_response),
            Err(error) => error_response(&error, &correlation_id),
        }
    }
}

/// Builds a [`Pipeline`] from a route registration.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    route: Arc<RouteSpec>,
    jwt: Option<JwtConfig>,
    options: PipelineOptions,
}

impl PipelineBuilder {
    /// Creates a builder with default options and no token settings.
    #[must_use]
    pub fn new(route: impl Into<Arc<RouteSpec>>) -> Self {
        Self {
            route: route.into(),
            jwt: None,
            options: PipelineOptions::default(),
        }
    }

    /// Token settings, required for routes that authenticate.
    #[must_use]
    pub fn jwt(mut self, config: JwtConfig) -> Self {
        self.jwt = Some(config);
        self
    }

    /// Replaces all options.
    #[must_use]
    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the correlation header.
    #[must_use]
    pub fn correlation_header(mut self, header: HeaderName) -> Self {
        self.options.correlation_header = header;
        self
    }

    /// Sets whether inbound correlation ids are adopted.
    #[must_use]
    pub fn trust_incoming_correlation(mut self, trust: bool) -> Self {
        self.options.trust_incoming_correlation = trust;
        self
    }

    /// Enables or disables the access line.
    #[must_use]
    pub fn logging(mut self, enabled: bool) -> Self {
        self.options.logging = enabled;
        self
    }

    /// Assembles the stages and wraps `handler`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::MissingJwtConfig`] if the route authenticates but
    ///   [`jwt`](Self::jwt) was not called
    /// - [`PipelineError::PathParameterMismatch`] if the path schema requires a
    ///   parameter missing from the path template
    pub fn build<H: Handler>(self, handler: H) -> PipelineResult<Pipeline> {
        let route = self.route;
        check_path_schema(&route)?;

        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(
            CorrelationStage::new(self.options.correlation_header.clone())
                .trust_incoming(self.options.trust_incoming_correlation),
        )];

        if route.requires_auth || !route.required_roles.is_empty() {
            let config = self.jwt.ok_or_else(|| PipelineError::MissingJwtConfig {
                route: route.key().to_string(),
            })?;
            stages.push(Box::new(AuthenticationStage::new(config)));
        }
        if !route.required_roles.is_empty() {
            stages.push(Box::new(AuthorizationStage::new(
                route.required_roles.iter().cloned(),
            )));
        }
        if let Some(schema) = route.body.as_ref().filter(|_| !route.skip_body_parsing) {
            stages.push(Box::new(BodyValidationStage::new(Arc::clone(schema))));
        }
        if let Some(schema) = &route.query {
            stages.push(Box::new(QueryValidationStage::new(Arc::clone(schema))));
        }
        if let Some(schema) = &route.path_params {
            stages.push(Box::new(PathValidationStage::new(Arc::clone(schema))));
        }

        tracing::debug!(
            route = %route.key(),
            stages = stages.len(),
            "pipeline assembled"
        );

        Ok(Pipeline {
            route,
            stages,
            handler: Arc::new(handler),
            options: self.options,
        })
    }
}

fn check_path_schema(route: &RouteSpec) -> PipelineResult<()> {
    let Some(object) = route.path_params.as_deref().and_then(|s| s.as_object()) else {
        return Ok(());
    };
    let placeholders = route.placeholders();
    match object
        .required()
        .iter()
        .find(|name| !placeholders.contains(name))
    {
        Some(name) => Err(PipelineError::PathParameterMismatch {
            route: route.key().to_string(),
            name: name.clone(),
        }),
        None => Ok(()),
    }
}

fn into_response(handler_response: HandlerResponse) -> Response {
    let HandlerResponse {
        status,
        headers,
        body,
    } = handler_response;
    let mut response = match body {
        ResponseBody::Empty => Response::with_body(status, Bytes::new()),
        ResponseBody::Json(value) => Response::json(status, &value),
        ResponseBody::Raw(bytes) => Response::with_body(status, bytes),
    };
    response.headers_mut().extend(headers);
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
