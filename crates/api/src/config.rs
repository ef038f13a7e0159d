//! Server configuration
//!
//! Layered: built-in defaults, then an optional `exoplanet-api.toml` (or the
//! file named by `EXOPLANET_API_CONFIG`), then `EXOPLANET_API_*` variables.

use config::{Config, Environment, File, FileFormat};
use inference_engine::DEFAULT_MODEL_PATH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "EXOPLANET_API";

/// Default config file stem
pub const DEFAULT_CONFIG_FILE: &str = "exoplanet-api";

/// API server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Model artifact path
    pub model_path: PathBuf,
    /// Replacement defaults table; embedded table when unset
    pub defaults_path: Option<PathBuf>,
    /// Max log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Install the Prometheus recorder and serve /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            defaults_path: None,
            log_level: "info".to_string(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Load from the config file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let file = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Config::builder()
            .add_source(File::with_name(&file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(raw: &str) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.model_path, PathBuf::from("model/random_forest.json"));
        assert!(config.defaults_path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ApiConfig::from_toml_str(
            r#"
            port = 9090
            model_path = "/srv/models/forest.json"
            log_json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.model_path, PathBuf::from("/srv/models/forest.json"));
        assert!(config.log_json);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(ApiConfig::from_toml_str("").unwrap(), ApiConfig::default());
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!(ApiConfig::from_toml_str("port = \"eighty\"").is_err());
    }
}
