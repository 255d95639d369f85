//! Authorization stage.
//!
//! Runs only for routes that declare required roles. The principal's role must
//! be one of them; otherwise the request ends with `FORBIDDEN`.

use crate::context::MiddlewareContext;
use crate::stage::{Stage, StageKind};
use daedalus_auth::authorize;
use daedalus_core::{ApiError, Role};
use indexmap::IndexSet;

/// Stage that enforces required roles.
#[derive(Debug, Clone)]
pub struct AuthorizationStage {
    required_roles: IndexSet<Role>,
}

impl AuthorizationStage {
    /// Creates a stage requiring one of `required_roles`.
    pub fn new(required_roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            required_roles: required_roles.into_iter().collect(),
        }
    }

    /// The roles this stage admits.
    pub fn required_roles(&self) -> &IndexSet<Role> {
        &self.required_roles
    }
}

impl Stage for AuthorizationStage {
    fn kind(&self) -> StageKind {
        StageKind::Authorization
    }

    fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError> {
        // Authentication always precedes this stage; no principal means it did not run.
        let principal = ctx
            .principal()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        authorize(principal, &self.required_roles)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use daedalus_core::{ErrorCode, Principal};

    fn ctx(role: Option<&str>) -> MiddlewareContext {
        let request = http::Request::builder().body(Bytes::new()).unwrap();
        let mut ctx = MiddlewareContext::from_request(request);
        if let Some(role) = role {
            ctx.set_principal(Principal::new("u-1", role));
        }
        ctx
    }

    #[test]
    fn test_member_is_forbidden_on_admin_route() {
        let stage = AuthorizationStage::new([Role::admin()]);
        let err = stage.apply(&mut ctx(Some("member"))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn test_admin_passes() {
        let stage = AuthorizationStage::new([Role::admin()]);
        assert!(stage.apply(&mut ctx(Some("admin"))).is_ok());
    }

    #[test]
    fn test_missing_principal_is_unauthorized() {
        let stage = AuthorizationStage::new([Role::admin()]);
        let err = stage.apply(&mut ctx(None)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}
