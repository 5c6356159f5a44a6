//! Configuration loading and environment variable handling

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::dialog::DialogConfig;
use crate::domains::guard::GuardConfig;
use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::messaging::MessagingConfig;
use crate::domains::sandbox::SandboxConfig;
use crate::domains::TetherConfig;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "TETHER".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<TetherConfig> {
        let content = std::fs::read_to_string(path)?;
        self.from_yaml(&content)
    }

    /// Parse YAML text, then apply environment overrides
    pub fn from_yaml(&self, content: &str) -> ConfigResult<TetherConfig> {
        let mut config: TetherConfig = if content.trim().is_empty() {
            TetherConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<TetherConfig> {
        let mut config = TetherConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<TetherConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut TetherConfig) -> ConfigResult<()> {
        self.apply_messaging_overrides(&mut config.messaging)?;
        self.apply_sandbox_overrides(&mut config.sandbox)?;
        self.apply_guard_overrides(&mut config.guard);
        self.apply_dialog_overrides(&mut config.dialog)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_messaging_overrides(&self, config: &mut MessagingConfig) -> ConfigResult<()> {
        if let Some(retries) = self.parse_env_var::<u32>("MAX_RETRIES")? {
            config.max_retries = retries;
        }

        if let Some(millis) = self.parse_env_var::<u64>("BACKOFF_BASE_MS")? {
            config.backoff_base = Duration::from_millis(millis);
        }

        // 0 disables the acknowledgment timer
        if let Some(millis) = self.parse_env_var::<u64>("ACK_TIMEOUT_MS")? {
            config.ack_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Some(require) = self.parse_env_var::<bool>("REQUIRE_ACK")? {
            config.require_ack = require;
        }

        Ok(())
    }

    fn apply_sandbox_overrides(&self, config: &mut SandboxConfig) -> ConfigResult<()> {
        if let Some(millis) = self.parse_env_var::<u64>("EVAL_TIMEOUT_MS")? {
            config.eval_timeout = Duration::from_millis(millis);
        }

        Ok(())
    }

    fn apply_guard_overrides(&self, config: &mut GuardConfig) {
        if let Ok(id) = self.get_env_var("EXTENSION_ID") {
            config.extension_id = id;
        }

        if let Ok(prefix) = self.get_env_var("ORIGIN_PREFIX") {
            config.origin_prefix = Some(prefix);
        }
    }

    fn apply_dialog_overrides(&self, config: &mut DialogConfig) -> ConfigResult<()> {
        if let Some(millis) = self.parse_env_var::<u64>("DIALOG_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Some(millis) = self.parse_env_var::<u64>("DIALOG_MAX_WAIT_MS")? {
            config.max_wait = Duration::from_millis(millis);
        }

        Ok(())
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Parse a prefixed variable, treating an unset one as `None`
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
