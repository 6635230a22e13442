// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that an optional value is present and not empty
    pub fn required(value: Option<&str>, field: &str) -> Result<()> {
        match value {
            Some(value) => Self::not_empty(value, field),
            None => Err(ConfigError::ValidationError(format!(
                "{} is required",
                field
            ))),
        }
    }

    /// Validate that a list has at least one non-empty entry and no blanks
    pub fn non_empty_list(values: &[String], field: &str) -> Result<()> {
        if values.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} must list at least one entry",
                field
            )));
        }
        for value in values {
            Self::not_empty(value, field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("tenants", "table").is_ok());
        assert!(ConfigValidator::not_empty("", "table").is_err());
        assert!(ConfigValidator::not_empty("   ", "table").is_err());
    }

    #[test]
    fn test_required_validation() {
        assert!(ConfigValidator::required(Some("App\\Tenant"), "model").is_ok());
        assert!(ConfigValidator::required(None, "model").is_err());
    }

    #[test]
    fn test_non_empty_list_validation() {
        let ids = vec!["id".to_string(), "slug".to_string()];
        assert!(ConfigValidator::non_empty_list(&ids, "identifiers").is_ok());
        assert!(ConfigValidator::non_empty_list(&[], "identifiers").is_err());
        assert!(ConfigValidator::non_empty_list(&["".to_string()], "identifiers").is_err());
    }
}
