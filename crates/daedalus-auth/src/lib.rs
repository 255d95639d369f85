//! # Daedalus Auth
//!
//! Stateless bearer-token authentication and role-based authorization.
//!
//! - [`bearer_token`] - Pulls the token out of an `Authorization` header
//! - [`Authenticator`] - Verifies HS256 tokens and builds a [`Principal`](daedalus_core::Principal)
//! - [`authorize`] - Checks the principal's role against a route's required roles
//! - [`TokenIssuer`] - Signs tokens for login flows and tests
//!
//! Verification happens entirely in memory. Expiry is checked against the wall
//! clock with zero leeway unless [`JwtConfig::leeway_secs`] says otherwise.

#![doc(html_root_url = "https://docs.rs/daedalus-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod authorize;
mod config;
mod error;
mod jwt;

pub use authorize::authorize;
pub use config::{JwtConfig, DEFAULT_ROLE_CLAIM};
pub use error::{AuthError, AuthResult};
pub use jwt::{authenticate, bearer_token, Authenticator, TokenClaims, TokenIssuer};
