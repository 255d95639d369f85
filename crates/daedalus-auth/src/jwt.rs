//! HS256 bearer-token verification and issuing.
//!
//! Verification is stateless: it needs only the shared secret and the wall
//! clock. No revocation list is consulted.

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use chrono::{Duration, Utc};
use daedalus_core::{Principal, Role};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};

/// Extracts the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
///
/// # Example
///
/// ```
/// use daedalus_auth::{bearer_token, AuthError};
///
/// assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
/// assert_eq!(bearer_token(None), Err(AuthError::MissingToken));
/// assert_eq!(bearer_token(Some("Basic dXNlcg==")), Err(AuthError::MalformedToken));
/// ```
pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let Some(header) = header else {
        return Err(AuthError::MissingToken);
    };
    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedToken)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(token)
}

/// Verifies a token against `config` and builds the [`Principal`].
///
/// Convenience for one-off checks; build an [`Authenticator`] to reuse keys.
pub fn authenticate(raw_token: Option<&str>, config: &JwtConfig) -> AuthResult<Principal> {
    let token = raw_token.ok_or(AuthError::MissingToken)?;
    Authenticator::new(config.clone()).authenticate(token)
}

/// Verifies bearer tokens.
#[derive(Clone)]
pub struct Authenticator {
    config: JwtConfig,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Authenticator {
    /// Creates an authenticator for `config`.
    pub fn new(config: JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            config,
            decoding_key,
            validation,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Verifies `token` and builds the [`Principal`] from its claims.
    ///
    /// Fails when the token is malformed, signed with another secret, expired,
    /// not yet valid, or lacks a `sub` or role claim.
    pub fn authenticate(&self, token: &str) -> AuthResult<Principal> {
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
                _ => AuthError::MalformedToken,
            })?;

        let claims = data.claims;
        if self.config.leeway_secs == 0 && is_expired_at(&claims, Utc::now().timestamp()) {
            return Err(AuthError::TokenExpired);
        }
        let subject_id = string_claim(&claims, "sub")
            .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;
        let role = role_claim(&claims, &self.config.role_claim)
            .ok_or_else(|| AuthError::MissingClaim(self.config.role_claim.clone()))?;

        Ok(Principal {
            subject_id,
            email: string_claim(&claims, "email"),
            name: string_claim(&claims, "name"),
            role,
            raw_claims: claims,
        })
    }
}

/// A token is expired once the clock reaches `exp`.
fn is_expired_at(claims: &Map<String, Value>, now: i64) -> bool {
    claims
        .get("exp")
        .and_then(Value::as_i64)
        .is_some_and(|exp| exp <= now)
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims.get(name).and_then(Value::as_str).map(ToString::to_string)
}

/// Reads the role from a string claim, or the first entry of an array claim.
fn role_claim(claims: &Map<String, Value>, name: &str) -> Option<Role> {
    match claims.get(name)? {
        Value::String(role) => Some(Role::new(role)),
        Value::Array(roles) => roles.first().and_then(Value::as_str).map(Role::new),
        _ => None,
    }
}

/// Claims to put into an issued token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    /// Subject.
    pub subject_id: String,
    /// Role.
    pub role: Role,
    /// Email, if any.
    pub email: Option<String>,
    /// Display name, if any.
    pub name: Option<String>,
    /// Lifetime from now.
    pub ttl: Duration,
    /// Extra claims.
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Claims for `subject_id` with `role`, valid for `ttl`.
    pub fn new(subject_id: impl Into<String>, role: impl Into<Role>, ttl: Duration) -> Self {
        Self {
            subject_id: subject_id.into(),
            role: role.into(),
            email: None,
            name: None,
            ttl,
            extra: Map::new(),
        }
    }

    /// Sets the email claim.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the name claim.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an arbitrary claim.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// Signs tokens that an [`Authenticator`] with the same config accepts.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use daedalus_auth::{Authenticator, JwtConfig, TokenClaims, TokenIssuer};
///
/// let config = JwtConfig::new("s3cret");
/// let token = TokenIssuer::new(config.clone())
///     .issue(&TokenClaims::new("u-1", "admin", Duration::minutes(15)))
///     .unwrap();
///
/// let principal = Authenticator::new(config).authenticate(&token).unwrap();
/// assert_eq!(principal.subject_id, "u-1");
/// assert_eq!(principal.role.as_str(), "admin");
/// ```
#[derive(Clone)]
pub struct TokenIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    /// Creates an issuer for `config`.
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
        }
    }

    /// Signs a token carrying `claims`.
    pub fn issue(&self, claims: &TokenClaims) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now + claims.ttl;

        let mut payload = claims.extra.clone();
        payload.insert("sub".into(), Value::from(claims.subject_id.clone()));
        payload.insert(self.config.role_claim.clone(), Value::from(claims.role.as_str()));
        payload.insert("iat".into(), Value::from(now.timestamp()));
        payload.insert("exp".into(), Value::from(exp.timestamp()));
        if let Some(email) = &claims.email {
            payload.insert("email".into(), Value::from(email.as_str()));
        }
        if let Some(name) = &claims.name {
            payload.insert("name".into(), Value::from(name.as_str()));
        }
        if let Some(issuer) = &self.config.issuer {
            payload.insert("iss".into(), Value::from(issuer.as_str()));
        }
        if let Some(audience) = &self.config.audience {
            payload.insert("aud".into(), Value::from(audience.as_str()));
        }

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test_secret_key_for_testing_only")
    }

    fn issue(config: &JwtConfig, claims: TokenClaims) -> String {
        TokenIssuer::new(config.clone()).issue(&claims).unwrap()
    }

    #[test]
    fn test_valid_token_yields_principal() {
        let token = issue(
            &config(),
            TokenClaims::new("user-1", "Admin", Duration::minutes(15))
                .with_email("a@example.com")
                .with_name("Ada"),
        );
        let principal = Authenticator::new(config()).authenticate(&token).unwrap();
        assert_eq!(principal.subject_id, "user-1");
        assert_eq!(principal.role, Role::admin());
        assert_eq!(principal.email.as_deref(), Some("a@example.com"));
        assert_eq!(principal.name.as_deref(), Some("Ada"));
        assert!(principal.claim("exp").is_some());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue(&config(), TokenClaims::new("u", "member", Duration::minutes(5)));
        let other = JwtConfig::new("a_completely_different_secret");
        assert_eq!(
            Authenticator::new(other).authenticate(&token),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_token_is_rejected_without_leeway() {
        let token = issue(&config(), TokenClaims::new("u", "member", Duration::seconds(-5)));
        assert_eq!(
            Authenticator::new(config()).authenticate(&token),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_token_expiring_now_is_rejected_without_leeway() {
        let token = issue(&config(), TokenClaims::new("u", "member", Duration::zero()));
        assert_eq!(
            Authenticator::new(config()).authenticate(&token),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = serde_json::json!({"exp": 100});
        let claims = claims.as_object().unwrap();
        assert!(!is_expired_at(claims, 99));
        assert!(is_expired_at(claims, 100));
        assert!(is_expired_at(claims, 101));
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let token = issue(&config(), TokenClaims::new("u", "member", Duration::seconds(-5)));
        let lenient = config().with_leeway_secs(60);
        assert!(Authenticator::new(lenient).authenticate(&token).is_ok());
    }

    #[test]
    fn test_malformed_token() {
        assert_eq!(
            Authenticator::new(config()).authenticate("not-a-token"),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn test_missing_role_claim() {
        let token = issue(&config(), TokenClaims::new("u", "member", Duration::minutes(5)));
        let other_claim = config().with_role_claim("permissions");
        assert_eq!(
            Authenticator::new(other_claim).authenticate(&token),
            Err(AuthError::MissingClaim("permissions".to_string()))
        );
    }

    #[test]
    fn test_role_from_array_claim() {
        let token = issue(
            &config(),
            TokenClaims::new("u", "member", Duration::minutes(5))
                .with_claim("roles", serde_json::json!(["Editor", "viewer"])),
        );
        let principal = Authenticator::new(config().with_role_claim("roles"))
            .authenticate(&token)
            .unwrap();
        assert_eq!(principal.role, Role::new("editor"));
    }

    #[test]
    fn test_issuer_and_audience() {
        let strict = config().with_issuer("daedalus").with_audience("api");
        let token = issue(&strict, TokenClaims::new("u", "member", Duration::minutes(5)));
        assert!(Authenticator::new(strict.clone()).authenticate(&token).is_ok());

        let other_issuer = config().with_issuer("elsewhere").with_audience("api");
        assert_eq!(
            Authenticator::new(other_issuer).authenticate(&token),
            Err(AuthError::InvalidIssuer)
        );

        let other_audience = config().with_issuer("daedalus").with_audience("admin");
        assert_eq!(
            Authenticator::new(other_audience).authenticate(&token),
            Err(AuthError::InvalidAudience)
        );

        // Audience is ignored when not configured.
        assert!(Authenticator::new(config()).authenticate(&token).is_ok());
    }

    #[test]
    fn test_authenticate_without_token() {
        assert_eq!(authenticate(None, &config()), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(Some("  BEARER   abc  ")), Ok("abc"));
        assert_eq!(bearer_token(Some("")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthError::MalformedToken));
        assert_eq!(bearer_token(Some("Bearer  ")), Err(AuthError::MalformedToken));
        assert_eq!(bearer_token(Some("Token abc")), Err(AuthError::MalformedToken));
    }
}
