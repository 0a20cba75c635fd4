//! Shared validation utilities

use thiserror::Error;

/// Errors from text-length validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Validate the trimmed character count of `value` against `min..=max`
///
/// Lengths are counted in `char`s, not bytes, so multi-byte titles are
/// measured the way users see them.
pub fn validate_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: Option<usize>,
) -> Result<(), TextValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TextValidationError::Required { field });
    }

    let len = trimmed.chars().count();
    if len < min {
        return Err(TextValidationError::TooShort { field, min });
    }

    if let Some(max) = max {
        if len > max {
            return Err(TextValidationError::TooLong { field, max });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_bounds() {
        assert!(validate_text("title", "Leak", 3, Some(200)).is_ok());
        assert_eq!(
            validate_text("title", "   ", 3, Some(200)),
            Err(TextValidationError::Required { field: "title" })
        );
        assert_eq!(
            validate_text("title", "ab", 3, Some(200)),
            Err(TextValidationError::TooShort { field: "title", min: 3 })
        );
        assert_eq!(
            validate_text("title", &"x".repeat(201), 3, Some(200)),
            Err(TextValidationError::TooLong { field: "title", max: 200 })
        );
    }

    #[test]
    fn test_validate_text_counts_chars() {
        // Three characters, six bytes
        assert!(validate_text("title", "äöü", 3, Some(3)).is_ok());
        assert!(validate_text("description", &"y".repeat(5000), 10, None).is_ok());
    }
}
