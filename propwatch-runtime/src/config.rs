//! Application configuration
//!
//! Every field has a default, so an absent file or a partial one is fine.
//! `PROPWATCH_USER_AGENT` overrides `http.user_agent` from the file.
//!
//! ```toml
//! [http]
//! user_agent = "propwatch/0.1 (N0CALL)"
//!
//! [breaker]
//! cool_down = 300
//!
//! [sources.pota]
//! refresh_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use propwatch_fetch::{BreakerConfig, HttpConfig, RetryPolicy, SourceSettings};

const USER_AGENT_ENV: &str = "PROPWATCH_USER_AGENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// One source's tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub enabled: bool,
    /// Refresh period; unset uses the source's own default
    pub refresh_secs: Option<u64>,
    /// Per-attempt deadline
    pub timeout_secs: u64,
    pub max_response_bytes: u64,
    /// Endpoint override (base URL for NOAA SWPC)
    pub url: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_secs: None,
            timeout_secs: 15,
            max_response_bytes: 2 * 1024 * 1024,
            url: None,
        }
    }
}

impl SourceConfig {
    pub fn refresh_interval(&self, default: Duration) -> Duration {
        self.refresh_secs.map(Duration::from_secs).unwrap_or(default)
    }

    /// Pipeline settings for the slot `slot_id`
    pub fn settings(&self, slot_id: &str, default_refresh: Duration) -> SourceSettings {
        SourceSettings::new(slot_id, self.refresh_interval(default_refresh))
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_response_bytes(self.max_response_bytes)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.refresh_secs == Some(0) {
            return Err(ConfigError::invalid(format!("sources.{}.refresh_secs", name), "must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(format!("sources.{}.timeout_secs", name), "must be > 0"));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::invalid(
                format!("sources.{}.max_response_bytes", name),
                "must be > 0",
            ));
        }
        if matches!(&self.url, Some(url) if url.trim().is_empty()) {
            return Err(ConfigError::invalid(format!("sources.{}.url", name), "must not be empty"));
        }
        Ok(())
    }
}

/// Per-source tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub noaa: SourceConfig,
    pub hamqsl: SourceConfig,
    pub pota: SourceConfig,
    pub sota: SourceConfig,
    pub contests: SourceConfig,
    pub meteors: SourceConfig,
}

impl SourcesConfig {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SourceConfig)> {
        [
            ("noaa", &self.noaa),
            ("hamqsl", &self.hamqsl),
            ("pota", &self.pota),
            ("sota", &self.sota),
            ("contests", &self.contests),
            ("meteors", &self.meteors),
        ]
        .into_iter()
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub breaker: BreakerConfig,
    pub retry: RetryPolicy,
    pub sources: SourcesConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(std::env::var(USER_AGENT_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self, user_agent: Option<String>) {
        if let Some(user_agent) = user_agent.filter(|ua| !ua.trim().is_empty()) {
            self.http.user_agent = user_agent;
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("http.user_agent", "must not be empty"));
        }

        let breaker = &self.breaker;
        if breaker.window_size == 0 {
            return Err(ConfigError::invalid("breaker.window_size", "must be > 0"));
        }
        if breaker.minimum_calls == 0 || breaker.minimum_calls > breaker.window_size {
            return Err(ConfigError::invalid(
                "breaker.minimum_calls",
                "must be between 1 and window_size",
            ));
        }
        if !(breaker.failure_rate_threshold > 0.0 && breaker.failure_rate_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "breaker.failure_rate_threshold",
                "must be in (0, 1]",
            ));
        }
        if breaker.half_open_probes == 0 {
            return Err(ConfigError::invalid("breaker.half_open_probes", "must be > 0"));
        }

        let retry = &self.retry;
        if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
            return Err(ConfigError::invalid("retry.multiplier", "must be >= 1.0"));
        }
        if retry.max_backoff_ms < retry.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.max_backoff_ms",
                "must be >= initial_backoff_ms",
            ));
        }

        for (name, source) in self.sources.iter() {
            source.validate(name)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.breaker.window_size, 10);
        assert_eq!(config.retry.max_retries, 2);
        assert!(config.sources.iter().all(|(_, s)| s.enabled));
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [breaker]
            cool_down = 300

            [sources.pota]
            refresh_secs = 30
            url = "http://localhost:8080/spots"

            [sources.contests]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.cool_down, Duration::from_secs(300));
        assert_eq!(config.breaker.minimum_calls, 4);
        assert_eq!(config.sources.pota.refresh_secs, Some(30));
        assert_eq!(config.sources.pota.timeout_secs, 15);
        assert_eq!(config.sources.pota.url.as_deref(), Some("http://localhost:8080/spots"));
        assert!(!config.sources.contests.enabled);
        assert!(config.sources.noaa.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_settings_use_source_default_refresh() {
        let source = SourceConfig::default();
        let settings = source.settings("pota", Duration::from_secs(60));
        assert_eq!(settings.slot_id, "pota");
        assert_eq!(settings.refresh_interval, Duration::from_secs(60));
        assert_eq!(settings.attempt_timeout, Duration::from_secs(15));

        let custom = SourceConfig {
            refresh_secs: Some(5),
            timeout_secs: 2,
            ..Default::default()
        };
        let settings = custom.settings("pota", Duration::from_secs(60));
        assert_eq!(settings.refresh_interval, Duration::from_secs(5));
        assert_eq!(settings.attempt_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::default();
        config.breaker.failure_rate_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "breaker.failure_rate_threshold"
        ));

        let mut config = AppConfig::default();
        config.breaker.minimum_calls = 20;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sources.sota.refresh_secs = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "sources.sota.refresh_secs"
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/propwatch.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = toml::from_str::<AppConfig>("breaker = 3").map_err(ConfigError::from).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_user_agent_overrides_file() {
        let file = r#"
            [http]
            user_agent = "from-file"
        "#;

        let mut config: AppConfig = toml::from_str(file).unwrap();
        config.apply_env_overrides(Some("from-env".to_string()));
        assert_eq!(config.http.user_agent, "from-env");

        let mut config: AppConfig = toml::from_str(file).unwrap();
        config.apply_env_overrides(None);
        assert_eq!(config.http.user_agent, "from-file");

        config.apply_env_overrides(Some("  ".to_string()));
        assert_eq!(config.http.user_agent, "from-file");
    }
}
