//! # Daedalus Middleware
//!
//! The request-handling pipeline that wraps a business handler.
//!
//! ## Pipeline Stages
//!
//! | Step | Stage            | Runs when                         | Failure                 |
//! |------|------------------|-----------------------------------|-------------------------|
//! | 1    | Correlation      | always                            | never fails             |
//! | 2    | Authentication   | the route requires auth           | 401 `UNAUTHORIZED`      |
//! | 3    | Authorization    | the route declares roles          | 403 `FORBIDDEN`         |
//! | 4    | Body validation  | a body schema, parsing not skipped| 400 / 422               |
//! | 5    | Query validation | a query schema                    | 422 `VALIDATION_ERROR`  |
//! | 6    | Path validation  | a path schema                     | 422 `VALIDATION_ERROR`  |
//!
//! The handler then runs with a frozen [`HandlerContext`](daedalus_core::HandlerContext).
//! Any error it returns, and any panic, is normalized exactly once into the
//! error envelope. Every response carries the correlation header.
//!
//! ## Example
//!
//! ```
//! use daedalus_auth::JwtConfig;
//! use daedalus_core::{ApiResult, HandlerContext, HandlerResponse, RouteSpec, Schema};
//! use daedalus_middleware::Pipeline;
//! use serde_json::json;
//!
//! async fn create_user(ctx: HandlerContext) -> ApiResult<HandlerResponse> {
//!     Ok(HandlerResponse::created(ctx.body().cloned().unwrap_or_default()))
//! }
//!
//! let route = RouteSpec::post("/users")
//!     .body(Schema::object([("name", Schema::string())]))
//!     .roles(["admin"]);
//!
//! let pipeline = Pipeline::builder(route)
//!     .jwt(JwtConfig::new("secret"))
//!     .build(create_user)
//!     .unwrap();
//! assert_eq!(pipeline.stage_names().len(), 4);
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineOptions};
pub use stage::{Stage, StageKind};
pub use stages::CORRELATION_ID_HEADER;
pub use types::{PathParams, Request, Response, ResponseExt, APPLICATION_JSON};
