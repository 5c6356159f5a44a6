//! Configuration validation traits and utilities

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate a non-zero duration
pub fn validate_positive_duration(value: Duration, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_zero() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0 ms", field_name),
        });
    }
    Ok(())
}

/// Validate an origin prefix such as `chrome-extension://<id>/`
pub fn validate_origin_prefix(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    validate_required_string(value, field_name, domain)?;

    let url = url::Url::parse(value).map_err(|e| ConfigError::DomainError {
        domain: domain.to_string(),
        message: format!("{} has invalid URL format: {}", field_name, e),
    })?;

    if !value.ends_with('/') {
        log::warn!(
            "{} '{}' does not end with '/'; it will also match sibling origins",
            field_name,
            url
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(3u32, "max_retries", "messaging").is_ok());
        assert!(validate_positive(0u32, "max_retries", "messaging").is_err());
    }

    #[test]
    fn test_validate_positive_duration() {
        assert!(validate_positive_duration(Duration::from_millis(1), "t", "d").is_ok());
        let err = validate_positive_duration(Duration::ZERO, "backoff_base_ms", "messaging").unwrap_err();
        assert!(err.to_string().contains("backoff_base_ms"));
    }

    #[test]
    fn test_validate_origin_prefix() {
        assert!(validate_origin_prefix("chrome-extension://abc/", "origin_prefix", "guard").is_ok());
        assert!(validate_origin_prefix("", "origin_prefix", "guard").is_err());
        assert!(validate_origin_prefix("not a url", "origin_prefix", "guard").is_err());
    }
}
