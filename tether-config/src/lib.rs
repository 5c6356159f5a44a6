//! Domain-driven configuration for Tether
//!
//! Settings are split by functional domain, each with its own defaults and
//! validation. Files are YAML; `TETHER_*` environment variables override
//! individual fields.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    dialog::DialogConfig, guard::GuardConfig, logging::LoggingConfig, messaging::MessagingConfig,
    sandbox::SandboxConfig, TetherConfig,
};

// Re-export utilities
pub use domains::utils::{serde_duration_ms, serde_duration_ms_option};
