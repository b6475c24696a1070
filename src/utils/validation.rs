use crate::utils::error::{RatesError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> RatesError {
    RatesError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Workspace-relative paths only need to be non-empty and free of NUL bytes.
pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path.escape_default(), "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(field_name, value, format!("Value must be at least {}", min_value)));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("paths.rates_dir", "au/seed-data").is_ok());
        assert!(validate_path("paths.rates_dir", "").is_err());
        assert!(validate_path("paths.rates_dir", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_positive_number("qa.issue_limit", 5, 1).is_ok());
        assert!(validate_positive_number("qa.issue_limit", 0, 1).is_err());
        assert!(validate_range("defaults.ohp_percent", 15.0, 0.0, 100.0).is_ok());
        assert!(validate_range("defaults.ohp_percent", 150.0, 0.0, 100.0).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("defaults.region", "Sydney Metro").is_ok());
        assert!(validate_non_empty_string("defaults.region", "  ").is_err());
    }
}
