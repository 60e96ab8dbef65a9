//! Configuration management for the tokenvet server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults. This follows the 12-factor app pattern.
//!
//! # Example
//!
//! ```ignore
//! use tokenvet_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("config.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Upstream identity API settings
    #[serde(default)]
    pub upstream: UpstreamSettings,

    /// Batch pipeline settings
    #[serde(default)]
    pub batch: BatchSettings,

    /// Audit sink settings
    #[serde(default)]
    pub audit: AuditSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server network settings.
///
/// There is deliberately no inbound request timeout: a full batch run is
/// paced at `batch.item_delay_ms` per item and legitimately takes many
/// seconds. The bounded timeouts live on the upstream calls instead.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Upstream identity API settings.
///
/// These settings can be overridden via environment variables with the
/// `TOKENVET_` prefix and `__` as the nested key separator:
///
/// - `TOKENVET_UPSTREAM__BASE_URL=https://...` - Point at a different API
/// - `TOKENVET_UPSTREAM__TIMEOUT_SECS=5` - Tighten the per-call timeout
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UpstreamSettings {
    /// Base URL of the identity API the tokens belong to.
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds. A timed-out call is classified as a
    /// network failure, never an unbounded hang.
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

fn default_upstream_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

/// Batch pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BatchSettings {
    /// Maximum tokens processed per batch; the tail beyond this is dropped
    /// and the response flagged as truncated.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Delay between consecutive upstream calls within a batch, in
    /// milliseconds. Paces the pipeline under upstream rate limits.
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            item_delay_ms: default_item_delay_ms(),
        }
    }
}

fn default_max_tokens() -> usize {
    100
}

fn default_item_delay_ms() -> u64 {
    200
}

/// Audit sink settings.
///
/// The audit channel is advisory: when `webhook_url` is unset, forwarded
/// events degrade to local diagnostics and nothing leaves the process.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuditSettings {
    /// Webhook endpoint events are POSTed to.
    pub webhook_url: Option<String>,

    /// Webhook call timeout in seconds.
    #[serde(default = "default_audit_timeout")]
    pub timeout_secs: u64,

    /// Forward request-received events externally.
    #[serde(default = "default_true")]
    pub forward_request: bool,

    /// Forward login events externally.
    #[serde(default = "default_true")]
    pub forward_login: bool,

    /// Forward error events externally.
    #[serde(default = "default_true")]
    pub forward_error: bool,

    /// Forward informational events externally (local-only by default).
    #[serde(default)]
    pub forward_info: bool,

    /// Forward per-item token-check events externally (local-only by
    /// default; one event per batch item is noisy).
    #[serde(default)]
    pub forward_token_check: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_audit_timeout(),
            forward_request: true,
            forward_login: true,
            forward_error: true,
            forward_info: false,
            forward_token_check: false,
        }
    }
}

fn default_audit_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `TOKENVET_` and use `__` as
    /// separator. For example:
    /// - `TOKENVET_SERVER__PORT=9090` overrides `server.port`
    /// - `TOKENVET_AUDIT__WEBHOOK_URL=...` overrides `audit.webhook_url`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&ServerConfig::default())?)
            // Add config file
            .add_source(File::from(path).format(FileFormat::Yaml))
            // Add environment variables with TOKENVET_ prefix
            // Use __ as separator for nested keys: TOKENVET_SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("TOKENVET")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    ///
    /// Uses default values and allows overrides via TOKENVET_ prefixed env vars.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(
                Environment::with_prefix("TOKENVET")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if !self.upstream.base_url.starts_with("http://")
            && !self.upstream.base_url.starts_with("https://")
        {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "upstream.base_url must be an http(s) URL, got: {}",
                    self.upstream.base_url
                ),
            });
        }

        if self.batch.max_tokens == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "batch.max_tokens must be greater than 0".to_string(),
            });
        }

        if let Some(url) = &self.audit.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigLoadError::Invalid {
                    message: "audit.webhook_url must be an http(s) URL".to_string(),
                });
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9090

upstream:
  base_url: "https://identity.internal/api"
  timeout_secs: 4

batch:
  max_tokens: 25
  item_delay_ms: 50

audit:
  webhook_url: "https://hooks.internal/audit"
  forward_token_check: true

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.upstream.base_url, "https://identity.internal/api");
        assert_eq!(config.upstream.timeout_secs, 4);
        assert_eq!(config.batch.max_tokens, 25);
        assert_eq!(config.batch.item_delay_ms, 50);
        assert_eq!(
            config.audit.webhook_url.as_deref(),
            Some("https://hooks.internal/audit")
        );
        assert!(config.audit.forward_token_check);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 5000
"#
        )
        .unwrap();

        std::env::set_var("TOKENVET_SERVER__PORT", "9999");
        std::env::set_var("TOKENVET_LOGGING__LEVEL", "warn");

        let config = ServerConfig::load(file.path()).unwrap();

        std::env::remove_var("TOKENVET_SERVER__PORT");
        std::env::remove_var("TOKENVET_LOGGING__LEVEL");

        assert_eq!(config.server.port, 9999); // Overridden by env
        assert_eq!(config.server.host, "127.0.0.1"); // From file
        assert_eq!(config.logging.level, "warn"); // Overridden by env
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.upstream.base_url = "not-a-url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("upstream.base_url"));

        let mut config = ServerConfig::default();
        config.batch.max_tokens = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch.max_tokens"));

        let mut config = ServerConfig::default();
        config.audit.webhook_url = Some("ftp://nope".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("audit.webhook_url"));

        let mut config = ServerConfig::default();
        config.logging.level = "invalid".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ServerConfig::load("/nonexistent/path/config.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let result = ServerConfig::load(file.path());
        assert!(matches!(result, Err(ConfigLoadError::Load(_))));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.batch.max_tokens, 100);
        assert_eq!(config.batch.item_delay_ms, 200);
        assert!(config.audit.webhook_url.is_none());
        assert!(config.audit.forward_error);
        assert!(!config.audit.forward_token_check);
        assert_eq!(config.logging.level, "info");
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("TOKENVET_BATCH__MAX_TOKENS", "10");

        let config = ServerConfig::from_env().unwrap();

        std::env::remove_var("TOKENVET_BATCH__MAX_TOKENS");

        assert_eq!(config.batch.max_tokens, 10);
        assert_eq!(config.server.port, 5000); // default
    }
}
