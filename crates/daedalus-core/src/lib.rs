//! # Daedalus Core
//!
//! Shared types for describing, validating and documenting typed HTTP endpoints.
//!
//! - [`Schema`] - Composable description of a data shape
//! - [`validate()`] / [`Validator`] - Checks values against a schema, collecting every violation
//! - [`ApiError`] / [`ErrorCode`] - Closed error taxonomy with stable codes and statuses
//! - [`Principal`] / [`Role`] - The authenticated caller
//! - [`RouteSpec`] / [`RouteRegistry`] - Endpoint registrations, shared by the
//!   pipeline and the contract compiler
//! - [`Handler`] / [`HandlerContext`] / [`HandlerResponse`] - The business handler contract

#![doc(html_root_url = "https://docs.rs/daedalus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
mod identity;
pub mod route;
pub mod schema;
pub mod validate;

pub use context::{CorrelationId, HandlerContext, MAX_CORRELATION_ID_LEN};
pub use error::{ApiError, ApiResult, ErrorCode, ErrorDetail, ErrorEnvelope, INTERNAL_ERROR_MESSAGE};
pub use handler::{BoxFuture, Handler, HandlerResponse, ResponseBody};
pub use identity::{Principal, Role};
pub use route::{FileField, ResponseSpec, RouteKey, RouteRegistry, RouteSpec};
pub use schema::{Format, Schema, SchemaError};
pub use validate::{validate, FieldPath, Outcome, Validator, Violation};
