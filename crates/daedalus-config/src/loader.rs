//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::schema::LogFormat;
use crate::{ConfigError, ConfigResult, DaedalusConfig};

/// Loads a [`DaedalusConfig`] in layers, later layers winning:
///
/// 1. Defaults or a preset
/// 2. A TOML or JSON file (or string)
/// 3. Environment variables named `PREFIX__SECTION__KEY`
///
/// A file replaces the whole configuration; fields it omits take their
/// serde defaults, not the preset's values.
///
/// # Example
///
/// ```no_run
/// use daedalus_config::ConfigLoader;
///
/// # fn main() -> Result<(), daedalus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("daedalus.toml")?
///     .with_dotenv()?
///     .with_env_prefix("DAEDALUS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: DaedalusConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DaedalusConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DaedalusConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing, unreadable, has another extension,
    /// does not parse, or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.config = parse(&content, format)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `format` (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Fails on an unknown format, a parse error, or unknown fields.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[auth]\nleeway_secs = 30", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.auth.leeway_secs, 30);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Loads `.env` from the working directory into the process environment.
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Fails when `.env` exists but is malformed.
    pub fn with_dotenv(self) -> ConfigResult<Self> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies `PREFIX__SECTION__KEY` overrides from the environment on
    /// [`load`](Self::load).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable or unknown override, or a failed
    /// [`DaedalusConfig::validate`].
    pub fn load(mut self) -> ConfigResult<DaedalusConfig> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_overrides(&prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> DaedalusConfig {
        self.config
    }

    fn apply_overrides<I>(&mut self, prefix: &str, vars: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if let Some(path) = key.strip_prefix(&marker) {
                self.apply_override(&key, path, &value)?;
            }
        }
        Ok(())
    }

    fn apply_override(&mut self, var: &str, path: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["AUTH", "SECRET"] => config.auth.secret = non_empty(value),
            ["AUTH", "LEEWAY_SECS"] => {
                config.auth.leeway_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(var, "expected integer"))?;
            }
            ["AUTH", "ISSUER"] => config.auth.issuer = non_empty(value),
            ["AUTH", "AUDIENCE"] => config.auth.audience = non_empty(value),
            ["AUTH", "ROLE_CLAIM"] => config.auth.role_claim = value.to_string(),

            ["LOGGING", "ENABLED"] => config.logging.enabled = bool_var(var, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(var, "expected 'json' or 'pretty'")),
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => config.logging.span_events = bool_var(var, value)?,
            ["LOGGING", "FILE_LINE_INFO"] => config.logging.file_line_info = bool_var(var, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => config.logging.include_target = bool_var(var, value)?,
            ["LOGGING", "SERVICE_NAME"] => config.logging.service_name = value.to_string(),

            ["PIPELINE", "CORRELATION_HEADER"] => {
                config.pipeline.correlation_header = value.to_string();
            }
            ["PIPELINE", "TRUST_INCOMING_CORRELATION"] => {
                config.pipeline.trust_incoming_correlation = bool_var(var, value)?;
            }
            ["PIPELINE", "ACCESS_LOG"] => config.pipeline.access_log = bool_var(var, value)?,

            ["DOCS", "TITLE"] => config.docs.title = value.to_string(),
            ["DOCS", "VERSION"] => config.docs.version = value.to_string(),
            ["DOCS", "DESCRIPTION"] => config.docs.description = non_empty(value),
            ["DOCS", "TERMS_OF_SERVICE"] => config.docs.terms_of_service = non_empty(value),

            [section, field @ ..] => {
                return Err(ConfigError::unknown_field(
                    field.join("__").to_lowercase(),
                    section.to_lowercase(),
                ))
            }
            [] => return Err(ConfigError::env_parse_error(var, "invalid key format")),
        }
        Ok(())
    }
}

fn parse(content: &str, format: &str) -> ConfigResult<DaedalusConfig> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn bool_var(var: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(var, "expected boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, DaedalusConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.level, "debug");

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert!(!config.pipeline.trust_incoming_correlation);
    }

    #[test]
    fn test_with_string_json() {
        let json = r#"{"docs": {"title": "Orders", "version": "3.0.0"}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.docs.title, "Orders");
        assert_eq!(config.docs.version, "3.0.0");
    }

    #[test]
    fn test_with_string_unknown_format() {
        let err = ConfigLoader::new().with_string("", "yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref f) if f == "yaml"));
    }

    #[test]
    fn test_file_not_found() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/daedalus.toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/daedalus.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, DaedalusConfig::default());
    }

    #[test]
    fn test_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_overrides(
                "APP",
                vars(&[
                    ("APP__AUTH__SECRET", "k3y"),
                    ("APP__AUTH__LEEWAY_SECS", "10"),
                    ("APP__LOGGING__FORMAT", "pretty"),
                    ("APP__PIPELINE__ACCESS_LOG", "off"),
                    ("APP__DOCS__TITLE", "Inventory"),
                    ("OTHER__AUTH__SECRET", "ignored"),
                    ("APP_HOME", "/srv/app"),
                ]),
            )
            .unwrap();
        let config = loader.load_unvalidated();
        assert_eq!(config.auth.secret.as_deref(), Some("k3y"));
        assert_eq!(config.auth.leeway_secs, 10);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(!config.pipeline.access_log);
        assert_eq!(config.docs.title, "Inventory");
    }

    #[test]
    fn test_empty_override_clears_optional() {
        let mut loader = ConfigLoader::new()
            .with_string("[auth]\nissuer = \"idp\"", "toml")
            .unwrap();
        loader
            .apply_overrides("APP", vars(&[("APP__AUTH__ISSUER", "")]))
            .unwrap();
        assert!(loader.load_unvalidated().auth.issuer.is_none());
    }

    #[test]
    fn test_override_parse_errors() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_overrides("APP", vars(&[("APP__AUTH__LEEWAY_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "APP__AUTH__LEEWAY_SECS"));

        let err = loader
            .apply_overrides("APP", vars(&[("APP__LOGGING__ENABLED", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("expected boolean"));
    }

    #[test]
    fn test_unknown_override() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_overrides("APP", vars(&[("APP__SERVER__PORT", "80")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownField { ref field, ref section } if field == "port" && section == "server"
        ));
    }
}
