//! Pipeline stages.
//!
//! Stages run in a fixed order. A route only gets the stages it needs:
//!
//! 1. [`correlation`] - Adopt or generate the correlation id (always)
//! 2. [`authentication`] - Verify the bearer token (routes requiring auth)
//! 3. [`authorization`] - Check required roles (routes declaring roles)
//! 4. [`validation`] - Validate body, then query, then path captures
//!
//! Failures from any stage or from the handler go through
//! [`error_normalization`].

pub mod authentication;
pub mod authorization;
pub mod correlation;
pub mod error_normalization;
pub mod validation;

pub use authentication::AuthenticationStage;
pub use authorization::AuthorizationStage;
pub use correlation::{CorrelationStage, CORRELATION_ID_HEADER};
pub use error_normalization::error_response;
pub use validation::{BodyValidationStage, PathValidationStage, QueryValidationStage};
