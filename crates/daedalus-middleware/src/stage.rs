//! The stage contract.
//!
//! A pipeline is an ordered list of stages folded over one
//! [`MiddlewareContext`]. Each stage either enriches the context and lets the
//! request continue, or returns an [`ApiError`] that ends the request.
//!
//! Stages are synchronous: everything they do (header parsing, in-memory
//! token verification, schema validation) completes without I/O.

use crate::context::MiddlewareContext;
use daedalus_core::ApiError;

/// One step of the pipeline.
///
/// # Invariants
///
/// - A stage MUST NOT depend on stages after it
/// - A stage MUST NOT be reordered relative to the others (see [`StageKind`])
pub trait Stage: Send + Sync + 'static {
    /// Which step this is.
    fn kind(&self) -> StageKind;

    /// The step name, used in logs.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Runs the step.
    fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError>;
}

/// The fixed order of pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum StageKind {
    /// Step 1: read or generate the correlation id.
    Correlation = 1,
    /// Step 2: verify the bearer token.
    Authentication = 2,
    /// Step 3: check the principal's role.
    Authorization = 3,
    /// Step 4: parse and validate the JSON body.
    BodyValidation = 4,
    /// Step 5a: validate the query string.
    QueryValidation = 5,
    /// Step 5b: validate path captures.
    PathValidation = 6,
}

impl StageKind {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::BodyValidation => "body_validation",
            Self::QueryValidation => "query_validation",
            Self::PathValidation => "path_validation",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [StageKind; 6] {
        [
            Self::Correlation,
            Self::Authentication,
            Self::Authorization,
            Self::BodyValidation,
            Self::QueryValidation,
            Self::PathValidation,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_sorted() {
        let all = StageKind::all();
        let mut sorted = all;
        sorted.sort();
        assert_eq!(all, sorted);
    }

    #[test]
    fn test_names() {
        let names: Vec<_> = StageKind::all().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "correlation",
                "authentication",
                "authorization",
                "body_validation",
                "query_validation",
                "path_validation",
            ]
        );
    }
}
