//! Client configuration and YAML loading.
//!
//! [`DeferlinkConfig`] is the read-only configuration every
//! [`MatchClient`](crate::MatchClient) call consults: credentials, endpoint,
//! the confidence threshold and the custom parameters merged into each
//! request.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! api_key: "dl_live_xxx"
//! base_url: "https://api.deferlink.io"
//! min_confidence: 0.85
//! timeout_secs: 15
//! log_verbose: false
//! custom_parameters:
//!   app_flavor: "beta"
//!   build: 412
//! ```
//!
//! ## Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DEFERLINK_API_KEY` | `api_key` |
//! | `DEFERLINK_BASE_URL` | `base_url` |
//! | `DEFERLINK_MIN_CONFIDENCE` | `min_confidence` |
//! | `DEFERLINK_VERBOSE` | `log_verbose` |
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamic::{DynamicMap, DynamicValue};

pub const DEFAULT_BASE_URL: &str = "https://api.deferlink.io";
pub const DEFAULT_MATCH_PATH: &str = "/v1/match";
pub const DEFAULT_DEFERRED_PATH: &str = "/v1/deferred";
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading or validating a [`DeferlinkConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Runtime configuration for the match client.
///
/// A missing `api_key` is allowed here; calls made without one fail with
/// [`DeferlinkError::NotInitialized`](crate::DeferlinkError::NotInitialized).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeferlinkConfig {
    /// Credential sent with every request. Never logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Scheme + host (+ optional base path) of the matching service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_match_path")]
    pub match_path: String,

    #[serde(default = "default_deferred_path")]
    pub deferred_path: String,

    /// Minimum (clamped) confidence a match needs to be surfaced.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Request timeout handed to the transport. The client adds no timeout
    /// of its own.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Emit request/response bodies at debug level.
    #[serde(default)]
    pub log_verbose: bool,

    /// Merged into every outgoing request body.
    #[serde(default)]
    pub custom_parameters: DynamicMap,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_match_path() -> String {
    DEFAULT_MATCH_PATH.to_string()
}

fn default_deferred_path() -> String {
    DEFAULT_DEFERRED_PATH.to_string()
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for DeferlinkConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            match_path: default_match_path(),
            deferred_path: default_deferred_path(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_verbose: false,
            custom_parameters: DynamicMap::new(),
        }
    }
}

impl DeferlinkConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: DeferlinkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_custom_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<DynamicValue>,
    ) -> Self {
        self.custom_parameters.insert(key.into(), value.into());
        self
    }

    /// Apply `DEFERLINK_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("DEFERLINK_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("DEFERLINK_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = lookup("DEFERLINK_MIN_CONFIDENCE") {
            self.min_confidence = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!(
                    "DEFERLINK_MIN_CONFIDENCE must be a number, got {raw:?}"
                ))
            })?;
        }
        if let Some(raw) = lookup("DEFERLINK_VERBOSE") {
            self.log_verbose = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        self.validate()?;
        Ok(self)
    }

    /// Whether an API key is present. Blank keys count as missing.
    pub fn is_initialized(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::Validation(format!(
                "min_confidence must be within [0.0, 1.0], got {}",
                self.min_confidence
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "base_url must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be >= 1".to_string(),
            ));
        }
        for (name, path) in [
            ("match_path", &self.match_path),
            ("deferred_path", &self.deferred_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = DeferlinkConfig::default();
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.base_url, "https://api.deferlink.io");
        assert_eq!(cfg.match_path, "/v1/match");
        assert_eq!(cfg.deferred_path, "/v1/deferred");
        assert_eq!(cfg.min_confidence, 0.8);
        assert_eq!(cfg.timeout_secs, 30);
        assert!(!cfg.log_verbose);
        assert!(cfg.custom_parameters.is_empty());
        assert!(cfg.validate().is_ok());
        assert!(!cfg.is_initialized());
    }

    #[test]
    fn yaml_fills_defaults() {
        let cfg = DeferlinkConfig::from_yaml(
            r#"
api_key: "dl_test"
min_confidence: 0.5
custom_parameters:
  flavor: beta
  build: 412
"#,
        )
        .unwrap();
        assert!(cfg.is_initialized());
        assert_eq!(cfg.min_confidence, 0.5);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            cfg.custom_parameters["flavor"],
            DynamicValue::String("beta".into())
        );
        assert_eq!(cfg.custom_parameters["build"], DynamicValue::Int(412));
    }

    #[test]
    fn yaml_rejects_bad_threshold() {
        let err = DeferlinkConfig::from_yaml("min_confidence: 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("min_confidence"));
    }

    #[test]
    fn yaml_parse_error() {
        let err = DeferlinkConfig::from_yaml("min_confidence: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn validation_rules() {
        let nan = DeferlinkConfig::default().with_min_confidence(f64::NAN);
        assert!(nan.validate().is_err());

        let blank_url = DeferlinkConfig::default().with_base_url("  ");
        assert!(blank_url.validate().is_err());

        let zero_timeout = DeferlinkConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let relative_path = DeferlinkConfig {
            match_path: "v1/match".into(),
            ..Default::default()
        };
        assert!(relative_path.validate().is_err());
    }

    #[test]
    fn blank_api_key_is_not_initialized() {
        assert!(!DeferlinkConfig::default().with_api_key("   ").is_initialized());
        assert!(DeferlinkConfig::default().with_api_key("k").is_initialized());
    }

    #[test]
    fn overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DEFERLINK_API_KEY", "env-key"),
            ("DEFERLINK_MIN_CONFIDENCE", "0.65"),
            ("DEFERLINK_VERBOSE", "TRUE"),
        ]);
        let cfg = DeferlinkConfig::default()
            .with_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("env-key"));
        assert_eq!(cfg.min_confidence, 0.65);
        assert!(cfg.log_verbose);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn override_with_garbage_threshold_fails() {
        let err = DeferlinkConfig::default()
            .with_overrides_from(|k| (k == "DEFERLINK_MIN_CONFIDENCE").then(|| "high".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("DEFERLINK_MIN_CONFIDENCE"));
    }

    #[test]
    fn from_file_roundtrip() {
        let cfg = DeferlinkConfig::default()
            .with_api_key("file-key")
            .with_custom_parameter("channel", "store");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_yaml::to_string(&cfg).unwrap().as_bytes())
            .unwrap();

        let loaded = DeferlinkConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn from_missing_file_is_io_error() {
        let err = DeferlinkConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
