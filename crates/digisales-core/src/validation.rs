//! # Validation Module
//!
//! Field validation for remote rows and operator input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Lenient: numbers or strings accepted, missing → None              │
//! │  └── Never fails a whole page because of one odd row                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Normalizer (Rust)                                            │
//! │  └── THIS MODULE: mandatory fields, lengths, integer ids               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE(invoice_id) → duplicate rows become "skipped"              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use digisales_core::validation::{validate_invoice_id, validate_search_query};
//!
//! assert!(validate_invoice_id("123456").is_ok());
//! assert_eq!(validate_search_query("  key ").unwrap(), "key");
//! ```

use crate::error::ValidationError;
use crate::{MAX_INVOICE_ID_LEN, MAX_SEARCH_QUERY_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank value and returns it trimmed.
pub fn validate_required<'a>(field: &str, value: Option<&'a str>) -> ValidationResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::required(field)),
    }
}

/// Validates an invoice id.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
///
/// ## Example
/// ```rust
/// use digisales_core::validation::validate_invoice_id;
///
/// assert!(validate_invoice_id("98765432").is_ok());
/// assert!(validate_invoice_id("").is_err());
/// assert!(validate_invoice_id(&"9".repeat(51)).is_err());
/// ```
pub fn validate_invoice_id(invoice_id: &str) -> ValidationResult<()> {
    let invoice_id = invoice_id.trim();

    if invoice_id.is_empty() {
        return Err(ValidationError::required("invoice_id"));
    }

    if invoice_id.chars().count() > MAX_INVOICE_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_id".to_string(),
            max: MAX_INVOICE_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns the most recent sales)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses a product id. Must be a positive integer.
pub fn validate_product_id(raw: &str) -> ValidationResult<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::required("product_id"));
    }

    let id: i64 = raw
        .parse()
        .map_err(|_| ValidationError::invalid_format("product_id", "must be an integer"))?;

    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "product_id".to_string(),
        });
    }

    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("email", Some(" a@b.c ")).unwrap(), "a@b.c");
        assert_eq!(
            validate_required("email", Some("   ")),
            Err(ValidationError::required("email"))
        );
        assert!(validate_required("email", None).is_err());
    }

    #[test]
    fn test_validate_invoice_id() {
        assert!(validate_invoice_id("100200300").is_ok());
        assert!(validate_invoice_id(&"1".repeat(50)).is_ok());

        assert!(validate_invoice_id("").is_err());
        assert!(validate_invoice_id("   ").is_err());
        assert!(validate_invoice_id(&"1".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("").unwrap(), "");
        assert_eq!(validate_search_query("  Steam key ").unwrap(), "Steam key");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_product_id() {
        assert_eq!(validate_product_id("3141592").unwrap(), 3141592);
        assert_eq!(validate_product_id(" 7 ").unwrap(), 7);

        assert!(matches!(
            validate_product_id("abc"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            validate_product_id("12.5"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            validate_product_id("0"),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_product_id(""),
            Err(ValidationError::Required { .. })
        ));
    }
}
