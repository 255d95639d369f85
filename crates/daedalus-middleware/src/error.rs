//! Pipeline construction errors.

use thiserror::Error;

/// Result type for building pipelines.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A route that cannot be served as registered.
///
/// These are startup errors. Request-time failures are
/// [`ApiError`](daedalus_core::ApiError)s and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The route requires authentication but no token settings were supplied.
    #[error("route {route} requires authentication but no JWT configuration was supplied")]
    MissingJwtConfig {
        /// The offending route, e.g. `GET /admin`.
        route: String,
    },

    /// The path schema requires a parameter the path template never captures.
    #[error("route {route} requires path parameter `{name}` which is not in the path template")]
    PathParameterMismatch {
        /// The offending route.
        route: String,
        /// The parameter missing from the template.
        name: String,
    },
}
