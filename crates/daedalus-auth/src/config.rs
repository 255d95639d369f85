//! Token verification settings.

use std::fmt;

/// Default claim the role is read from.
pub const DEFAULT_ROLE_CLAIM: &str = "role";

/// Settings for verifying HS256 bearer tokens.
///
/// The secret is redacted from `Debug` output.
///
/// # Example
///
/// ```
/// use daedalus_auth::JwtConfig;
///
/// let config = JwtConfig::new("s3cret")
///     .with_issuer("daedalus")
///     .with_leeway_secs(5);
/// assert_eq!(config.role_claim, "role");
/// assert!(!format!("{config:?}").contains("s3cret"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: String,
    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    pub leeway_secs: u64,
    /// Required `iss`, if any.
    pub issuer: Option<String>,
    /// Required `aud`, if any. When unset, `aud` is not checked.
    pub audience: Option<String>,
    /// Claim holding the caller's role.
    pub role_claim: String,
}

impl JwtConfig {
    /// Creates a config with zero leeway and no issuer or audience checks.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            leeway_secs: 0,
            issuer: None,
            audience: None,
            role_claim: DEFAULT_ROLE_CLAIM.to_string(),
        }
    }

    /// Sets the tolerated clock skew.
    #[must_use]
    pub fn with_leeway_secs(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Requires an issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Requires an audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Reads the role from another claim.
    #[must_use]
    pub fn with_role_claim(mut self, claim: impl Into<String>) -> Self {
        self.role_claim = claim.into();
        self
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("leeway_secs", &self.leeway_secs)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("role_claim", &self.role_claim)
            .finish()
    }
}
