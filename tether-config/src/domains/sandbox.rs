//! Sandbox configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_positive_duration, Validatable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Expiry window of one evaluation
    #[serde(rename = "eval_timeout_ms", with = "crate::domains::utils::serde_duration_ms")]
    pub eval_timeout: Duration,

    /// Iteration cap for any single loop; `null` lifts it
    pub loop_iteration_limit: Option<u64>,

    /// Call depth cap; `null` lifts it
    pub recursion_limit: Option<usize>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            eval_timeout: Duration::from_millis(5000),
            loop_iteration_limit: Some(10_000_000),
            recursion_limit: Some(512),
        }
    }
}

impl Validatable for SandboxConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive_duration(self.eval_timeout, "eval_timeout_ms", self.domain_name())?;

        if let Some(limit) = self.loop_iteration_limit {
            validate_positive(limit, "loop_iteration_limit", self.domain_name())?;
        }
        if let Some(limit) = self.recursion_limit {
            validate_positive(limit, "recursion_limit", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "sandbox"
    }
}
