//! # Error Module
//!
//! Domain errors raised while validating input, before any storage is touched.

use thiserror::Error;

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    // === Money errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // === Validation errors ===
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    // === State errors ===
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn unknown(field: &'static str, value: &str) -> Self {
        Self::UnknownValue {
            field,
            value: value.to_string(),
        }
    }

    /// Whether the error came from a malformed money amount
    pub fn is_invalid_amount(&self) -> bool {
        matches!(self, CoreError::InvalidAmount(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidAmount("-5".to_string());
        assert_eq!(err.to_string(), "Invalid amount: -5");

        let err = CoreError::unknown("loan status", "paused");
        assert_eq!(err.to_string(), "Unknown loan status: paused");

        let err = CoreError::InvalidTransition {
            from: "pending".to_string(),
            to: "active".to_string(),
        };
        assert!(err.to_string().contains("pending"));
        assert!(err.to_string().contains("active"));
    }

    #[test]
    fn test_error_checks() {
        assert!(CoreError::InvalidAmount("0".into()).is_invalid_amount());
        assert!(!CoreError::validation("bank name is empty").is_invalid_amount());
    }
}
