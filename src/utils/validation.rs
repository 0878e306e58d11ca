use crate::utils::error::{ApiError, Result};
use regex::Regex;
use std::sync::OnceLock;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

// ---- configuration checks ----

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ApiError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

// ---- request argument checks ----

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
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
        return Err(ApiError::validation(
            field_name,
            format!("Value {} must be between {} and {}", value, min, max),
        ));
    }
    Ok(())
}

pub fn validate_length<T>(field_name: &str, values: &[T], min: usize, max: usize) -> Result<()> {
    if values.len() < min || values.len() > max {
        return Err(ApiError::validation(
            field_name,
            format!(
                "Length must be between {} and {} (got {})",
                min,
                max,
                values.len()
            ),
        ));
    }
    Ok(())
}

pub fn validate_each_in_range(field_name: &str, values: &[f64], min: f64, max: f64) -> Result<()> {
    for value in values {
        if !value.is_finite() {
            return Err(ApiError::validation(field_name, "Value must be a finite number"));
        }
        validate_range(field_name, *value, min, max)?;
    }
    Ok(())
}

/// Bounds given as `[min, max]`.
pub fn validate_bounds(field_name: &str, values: &[f64]) -> Result<()> {
    validate_length(field_name, values, 2, 2)?;
    if values[0] > values[1] {
        return Err(ApiError::validation(
            field_name,
            format!("Lower bound {} is greater than upper bound {}", values[0], values[1]),
        ));
    }
    Ok(())
}

fn path_segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("static regex"))
}

/// A name used as a single directory under the model's case folder.
pub fn validate_path_segment(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;
    if value == "." || value == ".." || !path_segment_regex().is_match(value) {
        return Err(ApiError::validation(
            field_name,
            format!(
                "'{}' must only contain letters, digits, '_', '-' or '.'",
                value
            ),
        ));
    }
    Ok(())
}
