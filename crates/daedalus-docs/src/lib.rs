//! # Daedalus Docs
//!
//! Builds an OpenAPI 3.0 document from the same route registrations and
//! [`Schema`](daedalus_core::Schema) descriptors the request pipeline
//! enforces, so the published contract cannot drift from runtime behaviour.
//!
//! ## Quick Start
//!
//! ```
//! use daedalus_core::{ResponseSpec, RouteRegistry, RouteSpec, Schema};
//! use daedalus_docs::{ContractCompiler, DocumentConfig};
//!
//! let mut registry = RouteRegistry::new();
//! registry.register(
//!     RouteSpec::post("/auth/login")
//!         .tag("auth")
//!         .body(Schema::object([
//!             ("email", Schema::string()),
//!             ("password", Schema::string().min(8.0)),
//!         ]))
//!         .response(200, ResponseSpec::new("Logged in")),
//! );
//!
//! let compiler = ContractCompiler::new(DocumentConfig::new("Auth API", "1.0.0"));
//! let json = compiler.generate_json(&registry).unwrap();
//! assert!(json.contains("\"postAuthLogin\""));
//! ```
//!
//! ## What gets generated
//!
//! | Route field | Document output |
//! |-------------|-----------------|
//! | `path_params` | `in: path` parameters, always required |
//! | `query` | `in: query` parameters |
//! | `body` | `application/json` request body |
//! | `form_fields` / `file_fields` | `multipart/form-data` request body |
//! | `responses` | declared responses |
//! | auth / roles / schemas | `401` / `403` / `422` referencing `ErrorEnvelope` |

#![doc(html_root_url = "https://docs.rs/daedalus-docs/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod compiler;
mod error;
pub mod openapi;
mod render;

pub use compiler::{ContractCompiler, DocumentConfig, ERROR_ENVELOPE_SCHEMA};
pub use error::{DocsError, DocsResult};
pub use openapi::{
    Components, Info, OpenApi, Operation, Parameter, ParameterIn, PathItem, RequestBody,
    SchemaObject, SecurityScheme, Server, OPENAPI_VERSION,
};
pub use render::{flatten_parameters, render_schema};
