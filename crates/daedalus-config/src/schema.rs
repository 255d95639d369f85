//! Configuration sections.
//!
//! Every section rejects unknown fields and fills missing ones with defaults,
//! so a file only needs to name what it changes.

use crate::ConfigError;
use daedalus_auth::{JwtConfig, DEFAULT_ROLE_CLAIM};
use daedalus_docs::{DocumentConfig, Info, Server};
use daedalus_middleware::{PipelineOptions, CORRELATION_ID_HEADER};
use daedalus_telemetry::LogConfig;
use http::HeaderName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token verification settings.
///
/// Without a `secret` no [`JwtConfig`] is produced, and building a pipeline
/// for an authenticated route fails.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Shared HMAC secret.
    #[serde(default)]
    pub secret: Option<String>,

    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    #[serde(default)]
    pub leeway_secs: u64,

    /// Required `iss`, if any.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Required `aud`, if any.
    #[serde(default)]
    pub audience: Option<String>,

    /// Claim holding the caller's role.
    #[serde(default = "default_role_claim")]
    pub role_claim: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            leeway_secs: 0,
            issuer: None,
            audience: None,
            role_claim: default_role_claim(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("leeway_secs", &self.leeway_secs)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("role_claim", &self.role_claim)
            .finish()
    }
}

impl AuthConfig {
    /// The verification config, if a secret is set.
    #[must_use]
    pub fn jwt_config(&self) -> Option<JwtConfig> {
        let secret = self.secret.as_ref()?;
        let mut config = JwtConfig::new(secret.clone()).with_leeway_secs(self.leeway_secs);
        if let Some(issuer) = &self.issuer {
            config = config.with_issuer(issuer.clone());
        }
        if let Some(audience) = &self.audience {
            config = config.with_audience(audience.clone());
        }
        config.role_claim.clone_from(&self.role_claim);
        Some(config)
    }
}

fn default_role_claim() -> String {
    DEFAULT_ROLE_CLAIM.to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether a subscriber is installed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line.
    #[serde(default)]
    pub file_line_info: bool,

    /// Include the target.
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// Service name on the startup line.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
            service_name: default_service_name(),
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            json_format: config.format == LogFormat::Json,
            span_events: config.span_events,
            file_line_info: config.file_line_info,
            include_target: config.include_target,
            service_name: config.service_name.clone(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "daedalus".to_string()
}

/// Pipeline settings shared by every route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Header carrying the correlation id.
    #[serde(default = "default_correlation_header")]
    pub correlation_header: String,

    /// Adopt a well-formed inbound correlation id.
    #[serde(default = "default_true")]
    pub trust_incoming_correlation: bool,

    /// Emit one access line per request.
    #[serde(default = "default_true")]
    pub access_log: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            correlation_header: default_correlation_header(),
            trust_incoming_correlation: true,
            access_log: true,
        }
    }
}

impl TryFrom<&PipelineConfig> for PipelineOptions {
    type Error = ConfigError;

    fn try_from(config: &PipelineConfig) -> Result<Self, Self::Error> {
        let correlation_header = HeaderName::try_from(config.correlation_header.as_str())
            .map_err(|e| ConfigError::invalid_value("pipeline.correlation_header", e.to_string()))?;
        Ok(Self {
            correlation_header,
            trust_incoming_correlation: config.trust_incoming_correlation,
            logging: config.access_log,
        })
    }
}

fn default_correlation_header() -> String {
    CORRELATION_ID_HEADER.to_string()
}

/// A server listed in the published document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerEntry {
    /// Base URL.
    pub url: String,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Published document settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// API title.
    #[serde(default = "default_title")]
    pub title: String,

    /// API version.
    #[serde(default = "default_api_version")]
    pub version: String,

    /// API description.
    #[serde(default)]
    pub description: Option<String>,

    /// Terms of service URL.
    #[serde(default)]
    pub terms_of_service: Option<String>,

    /// Servers.
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_api_version(),
            description: None,
            terms_of_service: None,
            servers: Vec::new(),
        }
    }
}

impl From<&DocsConfig> for DocumentConfig {
    fn from(config: &DocsConfig) -> Self {
        Self {
            info: Info {
                title: config.title.clone(),
                version: config.version.clone(),
                description: config.description.clone(),
                terms_of_service: config.terms_of_service.clone(),
                ..Info::default()
            },
            servers: config
                .servers
                .iter()
                .map(|entry| Server {
                    url: entry.url.clone(),
                    description: entry.description.clone(),
                })
                .collect(),
        }
    }
}

fn default_title() -> String {
    "API".to_string()
}

fn default_api_version() -> String {
    "0.1.0".to_string()
}

fn default_true() -> bool {
    true
}
