//! Typed configuration for Daedalus services.
//!
//! The library crates never read files or the environment. A host loads a
//! [`DaedalusConfig`] once at startup and hands the pieces to the crates that
//! need them:
//!
//! - [`DaedalusConfig::jwt_config`] for `PipelineBuilder::jwt`
//! - [`DaedalusConfig::pipeline_options`] for `PipelineBuilder::options`
//! - [`DaedalusConfig::log_config`] for `daedalus_telemetry::init_logging`
//! - [`DaedalusConfig::document_config`] for `ContractCompiler::new`
//!
//! # Configuration File Format
//!
//! ```toml
//! [auth]
//! secret = "change-me"
//! leeway_secs = 0
//! role_claim = "role"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [pipeline]
//! correlation_header = "x-correlation-id"
//! trust_incoming_correlation = true
//! access_log = true
//!
//! [docs]
//! title = "Orders API"
//! version = "1.4.0"
//!
//! [[docs.servers]]
//! url = "https://orders.example.com"
//! ```
//!
//! # Environment Variable Overrides
//!
//! With [`ConfigLoader::with_env_prefix`], variables named
//! `PREFIX__SECTION__KEY` override file values, e.g.
//! `DAEDALUS__AUTH__SECRET` or `DAEDALUS__LOGGING__FORMAT=pretty`.

#![doc(html_root_url = "https://docs.rs/daedalus-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::DaedalusConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{AuthConfig, DocsConfig, LogFormat, LoggingConfig, PipelineConfig, ServerEntry};
