//! Role-based authorization.

use crate::error::{AuthError, AuthResult};
use daedalus_core::{Principal, Role};

/// Checks that `principal` holds one of `required_roles`.
///
/// An empty requirement admits every authenticated principal.
///
/// # Example
///
/// ```
/// use daedalus_auth::authorize;
/// use daedalus_core::{Principal, Role};
///
/// let member = Principal::new("u-1", "member");
/// assert!(authorize(&member, &[]).is_ok());
/// assert!(authorize(&member, &[Role::admin()]).is_err());
/// ```
pub fn authorize<'a, I>(principal: &Principal, required_roles: I) -> AuthResult<()>
where
    I: IntoIterator<Item = &'a Role>,
{
    let mut required = required_roles.into_iter().peekable();
    if required.peek().is_none() || principal.has_any_role(required) {
        return Ok(());
    }
    tracing::debug!(
        principal = %principal.log_id(),
        role = %principal.role,
        "principal lacks a required role"
    );
    Err(AuthError::Forbidden {
        role: principal.role.clone(),
    })
}
