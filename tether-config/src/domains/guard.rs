//! Privileged sender guard configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_origin_prefix, validate_required_string, Validatable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Extension id privileged senders must declare, if they declare one
    pub extension_id: String,

    /// Trusted document origin; derived from `extension_id` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_prefix: Option<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            extension_id: "tether".to_string(),
            origin_prefix: None,
        }
    }
}

impl GuardConfig {
    /// The configured origin prefix, or `chrome-extension://<id>/`
    pub fn resolved_origin_prefix(&self) -> String {
        self.origin_prefix
            .clone()
            .unwrap_or_else(|| format!("chrome-extension://{}/", self.extension_id))
    }
}

impl Validatable for GuardConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.extension_id, "extension_id", self.domain_name())?;
        validate_origin_prefix(&self.resolved_origin_prefix(), "origin_prefix", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "guard"
    }
}
