//! Messaging bus configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive_duration, Validatable};

/// Retries past this count are allowed but almost always a mistake
const MAX_SENSIBLE_RETRIES: u32 = 10;

/// Process-wide delivery defaults for the messaging bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    #[serde(rename = "backoff_base_ms", with = "crate::domains::utils::serde_duration_ms")]
    pub backoff_base: Duration,

    /// Acknowledgment timer; `null` disables it
    #[serde(rename = "ack_timeout_ms", with = "crate::domains::utils::serde_duration_ms_option")]
    pub ack_timeout: Option<Duration>,

    /// Whether responses must carry an `ack`, `success` or `ok` field
    #[serde(default = "crate::domains::utils::default_false")]
    pub require_ack: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(150),
            ack_timeout: Some(Duration::from_millis(3000)),
            require_ack: false,
        }
    }
}

impl Validatable for MessagingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive_duration(self.backoff_base, "backoff_base_ms", self.domain_name())?;

        if let Some(ack_timeout) = self.ack_timeout {
            validate_positive_duration(ack_timeout, "ack_timeout_ms", self.domain_name())?;
        }

        if self.max_retries > MAX_SENSIBLE_RETRIES {
            log::warn!(
                "max_retries {} backs off for up to {:?} in total",
                self.max_retries,
                self.backoff_base.saturating_mul(1u32 << self.max_retries.min(31))
            );
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "messaging"
    }
}
