//! Structured logging for Daedalus.
//!
//! - **Logging**: JSON or pretty `tracing-subscriber` output behind an env filter
//! - **Fields**: shared field names so log lines from every crate line up
//! - **Redaction**: masking of password, secret and token members before logging
//!
//! The request pipeline logs exactly one access line per completed request
//! through [`log_request_complete!`], and one error line per unexpected fault
//! through [`log_request_error!`]. Both carry the correlation id.

#![doc(html_root_url = "https://docs.rs/daedalus-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod redact;

#[doc(hidden)]
pub use tracing;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
