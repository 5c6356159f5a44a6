//! Domain-specific configuration modules

pub mod dialog;
pub mod guard;
pub mod logging;
pub mod messaging;
pub mod sandbox;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Tether configuration combining all domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TetherConfig {
    /// Messaging bus delivery defaults
    pub messaging: messaging::MessagingConfig,

    /// Evaluation sandbox
    pub sandbox: sandbox::SandboxConfig,

    /// Privileged sender guard
    pub guard: guard::GuardConfig,

    /// Dialog argument polling
    pub dialog: dialog::DialogConfig,

    /// Logging configuration
    pub logging: logging::LoggingConfig,
}

impl TetherConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.messaging.validate()?;
        self.sandbox.validate()?;
        self.guard.validate()?;
        self.dialog.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = TetherConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
