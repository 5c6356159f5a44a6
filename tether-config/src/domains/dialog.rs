//! Dialog argument polling configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive_duration, Validatable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    #[serde(rename = "poll_interval_ms", with = "crate::domains::utils::serde_duration_ms")]
    pub poll_interval: Duration,

    #[serde(rename = "max_wait_ms", with = "crate::domains::utils::serde_duration_ms")]
    pub max_wait: Duration,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            max_wait: Duration::from_millis(6000),
        }
    }
}

impl Validatable for DialogConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive_duration(self.poll_interval, "poll_interval_ms", self.domain_name())?;
        validate_positive_duration(self.max_wait, "max_wait_ms", self.domain_name())?;

        if self.poll_interval > self.max_wait {
            return Err(self.validation_error(format!(
                "poll_interval_ms ({}) cannot exceed max_wait_ms ({})",
                self.poll_interval.as_millis(),
                self.max_wait.as_millis()
            )));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "dialog"
    }
}
