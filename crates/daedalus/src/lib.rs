//! # Daedalus
//!
//! Typed HTTP endpoints whose runtime checks and published contract come from
//! one declaration.
//!
//! A [`RouteSpec`](prelude::RouteSpec) names the method, path template, input
//! schemas and access rules of an endpoint. The same registration drives:
//!
//! - a [`Pipeline`](prelude::Pipeline) that assigns a correlation id,
//!   authenticates, authorizes, validates and normalizes errors before and
//!   after the business handler
//! - the [`ContractCompiler`](prelude::ContractCompiler), which renders every
//!   registration into an OpenAPI 3.0 document
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use daedalus::prelude::*;
//!
//! let config = ConfigLoader::new().with_env_prefix("DAEDALUS").load()?;
//! daedalus::telemetry::init_logging(&config.log_config())?;
//!
//! let mut registry = RouteRegistry::new();
//! registry.register(
//!     RouteSpec::post("/users")
//!         .roles(["admin"])
//!         .body(Schema::object([("email", Schema::string().format(Format::Email))])),
//! );
//!
//! let pipelines = registry
//!     .iter()
//!     .map(|route| {
//!         Pipeline::builder(route.clone())
//!             .jwt(config.jwt_config().expect("auth.secret"))
//!             .options(config.pipeline_options()?)
//!             .build(create_user)
//!     })
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let openapi = ContractCompiler::new(config.document_config())
//!     .with_security_scheme("bearerAuth", SecurityScheme::bearer_jwt())
//!     .generate_json(&registry)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Correlation → Authentication → Authorization → Body → Query → Path → Handler
//!                                                                               ↓
//! Response ← Correlation header ← Error normalization ←─────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export schema, validation, error and route types
pub use daedalus_core as core;

// Re-export token verification
pub use daedalus_auth as auth;

// Re-export the request pipeline
pub use daedalus_middleware as middleware;

// Re-export the contract compiler
pub use daedalus_docs as docs;

// Re-export logging setup
pub use daedalus_telemetry as telemetry;

// Re-export configuration
pub use daedalus_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use daedalus::prelude::*;
///
/// let route = RouteSpec::get("/health");
/// assert_eq!(route.operation_id(), "getHealth");
/// ```
pub mod prelude {
    pub use daedalus_core::{
        ApiError, ApiResult, ErrorCode, FileField, Format, Handler, HandlerContext,
        HandlerResponse, Principal, ResponseSpec, Role, RouteRegistry, RouteSpec, Schema,
    };

    pub use daedalus_auth::{JwtConfig, TokenClaims, TokenIssuer};

    pub use daedalus_middleware::{Pipeline, PipelineOptions, Request, Response};

    pub use daedalus_docs::{ContractCompiler, DocumentConfig, SecurityScheme, Server};

    pub use daedalus_config::{ConfigLoader, DaedalusConfig};
}
