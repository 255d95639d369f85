//! The root configuration type.

use crate::schema::{AuthConfig, DocsConfig, LogFormat, LoggingConfig, PipelineConfig};
use crate::{ConfigError, ConfigResult};
use daedalus_auth::JwtConfig;
use daedalus_docs::DocumentConfig;
use daedalus_middleware::PipelineOptions;
use daedalus_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Complete configuration of a Daedalus service.
///
/// # Example
///
/// ```
/// use daedalus_config::DaedalusConfig;
///
/// let config = DaedalusConfig::default();
/// assert!(config.validate().is_ok());
/// assert!(config.jwt_config().is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DaedalusConfig {
    /// Token verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Request pipeline.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Published API document.
    #[serde(default)]
    pub docs: DocsConfig,
}

impl DaedalusConfig {
    /// Pretty debug logging with span events and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                span_events: true,
                file_line_info: true,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// JSON logging at info level; inbound correlation ids are not trusted.
    #[must_use]
    pub fn production() -> Self {
        Self {
            pipeline: PipelineConfig {
                trust_incoming_correlation: false,
                ..PipelineConfig::default()
            },
            ..Self::default()
        }
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(secret) = &self.auth.secret {
            if secret.is_empty() {
                return Err(ConfigError::invalid_value("auth.secret", "must not be empty"));
            }
        }
        if self.auth.role_claim.is_empty() {
            return Err(ConfigError::invalid_value("auth.role_claim", "must not be empty"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }
        PipelineOptions::try_from(&self.pipeline)?;
        if self.docs.title.is_empty() {
            return Err(ConfigError::invalid_value("docs.title", "must not be empty"));
        }
        if self.docs.version.is_empty() {
            return Err(ConfigError::invalid_value("docs.version", "must not be empty"));
        }
        if let Some(index) = self.docs.servers.iter().position(|s| s.url.is_empty()) {
            return Err(ConfigError::invalid_value(
                format!("docs.servers[{index}].url"),
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Verification settings, if a secret is configured.
    #[must_use]
    pub fn jwt_config(&self) -> Option<JwtConfig> {
        self.auth.jwt_config()
    }

    /// Logging settings for [`daedalus_telemetry::init_logging`].
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from(&self.logging)
    }

    /// Options applied to every pipeline.
    ///
    /// # Errors
    ///
    /// Fails when the correlation header is not a valid header name.
    pub fn pipeline_options(&self) -> ConfigResult<PipelineOptions> {
        PipelineOptions::try_from(&self.pipeline)
    }

    /// Document settings for the contract compiler.
    #[must_use]
    pub fn document_config(&self) -> DocumentConfig {
        DocumentConfig::from(&self.docs)
    }
}
