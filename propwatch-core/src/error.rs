//! Validation errors raised by entity constructors

use thiserror::Error;

/// Rejection of a malformed entity at construction time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("required field `{0}` is empty")]
    Empty(&'static str),

    #[error("field `{field}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("field `{0}` is not a finite number")]
    NotFinite(&'static str),

    #[error("invalid time window: {0}")]
    InvalidWindow(String),
}

/// Check that `value` is finite and within `[min, max]`
pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(field));
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Check that a trimmed string field is non-empty
pub(crate) fn check_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range("k", 4.0, 0.0, 9.0).is_ok());
        assert!(check_range("k", 0.0, 0.0, 9.0).is_ok());
        assert_eq!(
            check_range("k", 9.5, 0.0, 9.0),
            Err(ValidationError::OutOfRange {
                field: "k",
                value: 9.5,
                min: 0.0,
                max: 9.0
            })
        );
        assert_eq!(
            check_range("k", f64::NAN, 0.0, 9.0),
            Err(ValidationError::NotFinite("k"))
        );
    }

    #[test]
    fn test_check_non_empty() {
        assert!(check_non_empty("callsign", "K1ABC").is_ok());
        assert_eq!(
            check_non_empty("callsign", "   "),
            Err(ValidationError::Empty("callsign"))
        );
    }
}
