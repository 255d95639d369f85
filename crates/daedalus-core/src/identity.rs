//! Authenticated caller identity.
//!
//! A [`Principal`] is derived from a verified bearer token for the duration of
//! one request. It is never persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A caller role, compared case-insensitively.
///
/// # Example
///
/// ```
/// use daedalus_core::Role;
///
/// assert_eq!(Role::new("ADMIN"), Role::admin());
/// assert_eq!(Role::admin().as_str(), "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Role(String);

impl Role {
    /// Creates a role, normalizing it to lowercase.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// The `admin` role.
    #[must_use]
    pub fn admin() -> Self {
        Self::new("admin")
    }

    /// The `member` role.
    #[must_use]
    pub fn member() -> Self {
        Self::new("member")
    }

    /// The normalized role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Token subject (`sub`).
    pub subject_id: String,
    /// Email claim, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name claim, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Role claim.
    pub role: Role,
    /// Every claim of the verified token.
    #[serde(skip)]
    pub raw_claims: Map<String, Value>,
}

impl Principal {
    /// Creates a principal with no optional claims.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, role: impl Into<Role>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: None,
            name: None,
            role: role.into(),
            raw_claims: Map::new(),
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns `true` if the principal's role is one of `roles`.
    #[must_use]
    pub fn has_any_role<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a Role>,
    {
        roles.into_iter().any(|role| *role == self.role)
    }

    /// Looks up a raw claim.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.raw_claims.get(name)
    }

    /// Identifier safe to include in logs.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("user:{}", self.subject_id)
    }
}
