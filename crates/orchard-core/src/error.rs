//! # Error Types
//!
//! Domain-specific error types for orchard-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  orchard-core errors (this file)                                        │
//! │  ├── CoreError        - Pure business-rule failures                     │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  orchard-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  orchard-ops errors (separate crate)                                    │
//! │  └── OpsError         - Orchestration/state-conflict failures           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OpsError → UI layer                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No sellable batch exists for the product.
    ///
    /// ## When This Occurs
    /// - Every batch for the product is expired, sold out, or removed
    /// - The product was never received into stock
    #[error("No stock available for product {product_id}")]
    NoStockAvailable { product_id: String },

    /// Clock events are not in a computable order.
    ///
    /// ## When This Occurs
    /// - Clock-out timestamp precedes clock-in
    /// - A break falls outside the shift window
    #[error("Invalid clock sequence: {reason}")]
    InvalidClockSequence { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::NoStockAvailable {
            product_id: "p-100".to_string(),
        };
        assert_eq!(err.to_string(), "No stock available for product p-100");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "employee_id".to_string(),
        };
        assert_eq!(err.to_string(), "employee_id is required");

        let err = ValidationError::OutOfRange {
            field: "starting_cash".to_string(),
            min: 0,
            max: 500_000,
        };
        assert_eq!(
            err.to_string(),
            "starting_cash must be between 0 and 500000"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
