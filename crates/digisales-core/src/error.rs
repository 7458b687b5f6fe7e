//! # Error Types
//!
//! Domain-specific error types for digisales-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  digisales-core errors (this file)                                     │
//! │  └── ValidationError  - A remote row or operator input is unusable     │
//! │                                                                         │
//! │  digisales-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  digisales-sync errors (separate crate)                                │
//! │  └── SyncError        - Pass-level failures (config, remote, db)       │
//! │                                                                         │
//! │  Flow: ValidationError → RowFailure (per row, collected)               │
//! │        DbError / remote failure → SyncError (per pass, recorded)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Validation errors.
///
/// Raised by the normalizer for remote rows and by operator input checks.
/// A row that fails validation is rejected on its own; the pass continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric id, malformed timestamp).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("product_entry");
        assert_eq!(err.to_string(), "product_entry is required");

        let err = ValidationError::TooLong {
            field: "invoice_id".to_string(),
            max: 50,
        };
        assert_eq!(err.to_string(), "invoice_id must be at most 50 characters");

        let err = ValidationError::invalid_format("date_put", "expected YYYY-MM-DD HH:MM:SS");
        assert_eq!(
            err.to_string(),
            "date_put has invalid format: expected YYYY-MM-DD HH:MM:SS"
        );
    }
}
