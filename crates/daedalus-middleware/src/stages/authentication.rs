//! Authentication stage.
//!
//! Extracts the bearer token from the `Authorization` header, verifies it and
//! stores the resulting [`Principal`](daedalus_core::Principal) in the context.
//! Any failure ends the request with `UNAUTHORIZED`.

use crate::context::MiddlewareContext;
use crate::stage::{Stage, StageKind};
use daedalus_auth::{bearer_token, Authenticator, JwtConfig};
use daedalus_core::ApiError;
use http::header::AUTHORIZATION;

/// Stage that verifies bearer tokens.
#[derive(Clone)]
pub struct AuthenticationStage {
    authenticator: Authenticator,
}

impl AuthenticationStage {
    /// Creates a stage verifying tokens against `config`.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        Self {
            authenticator: Authenticator::new(config),
        }
    }
}

impl Stage for AuthenticationStage {
    fn kind(&self) -> StageKind {
        StageKind::Authentication
    }

    fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError> {
        let token = bearer_token(ctx.header(AUTHORIZATION))?;
        let principal = self.authenticator.authenticate(token)?;
        tracing::debug!(
            correlation_id = %ctx.correlation_id(),
            principal = %principal.log_id(),
            "caller authenticated"
        );
        ctx.set_principal(principal);
        Ok(())
    }
}
