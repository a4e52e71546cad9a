//! # Validation Module
//!
//! Input validation utilities for Orchard POS.
//!
//! Validation runs in the orchestration layer before any business logic or
//! database write. The database schema (NOT NULL, CHECK, FK constraints) is
//! the second line of defence behind these checks.
//!
//! ## Usage
//! ```rust
//! use orchard_core::validation::{validate_entity_id, validate_starting_cash};
//!
//! validate_entity_id("employee_id", "550e8400-e29b-41d4-a716-446655440000").unwrap();
//! validate_starting_cash(5000, 500_000).unwrap();
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum unit quantity on a single line.
pub const MAX_LINE_QUANTITY: i64 = 999;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an entity id field (UUID v4 string).
///
/// ## Rules
/// - Must not be empty
/// - Must parse as a UUID
pub fn validate_entity_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates a free-form reference id (employee badge, terminal name).
///
/// ## Rules
/// - Must not be empty
/// - Maximum 64 characters
pub fn validate_reference_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(())
}

// =============================================================================
// Cash Validators
// =============================================================================

/// Validates a starting cash float against the configured ceiling.
///
/// ## Rules
/// - Must be non-negative
/// - Must not exceed `ceiling_cents`
pub fn validate_starting_cash(cents: i64, ceiling_cents: i64) -> ValidationResult<()> {
    if cents < 0 || cents > ceiling_cents {
        return Err(ValidationError::OutOfRange {
            field: "starting_cash".to_string(),
            min: 0,
            max: ceiling_cents,
        });
    }

    Ok(())
}

/// Validates a counted drawer amount.
///
/// ## Rules
/// - Must be non-negative (a drawer cannot hold negative cash)
pub fn validate_drawer_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a unit quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a requested allocation amount (units or weight).
///
/// ## Rules
/// - Must be positive and finite
pub fn validate_requested_units(units: f64) -> ValidationResult<()> {
    if !units.is_finite() || units <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "requested_quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_entity_id() {
        assert!(validate_entity_id("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_entity_id("id", "").is_err());
        assert!(validate_entity_id("id", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_reference_id() {
        assert!(validate_reference_id("terminal_id", "pos-01").is_ok());
        assert!(validate_reference_id("terminal_id", "").is_err());
        assert!(validate_reference_id("terminal_id", &"x".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_starting_cash() {
        assert!(validate_starting_cash(0, 500_000).is_ok());
        assert!(validate_starting_cash(5000, 500_000).is_ok());
        assert!(validate_starting_cash(500_000, 500_000).is_ok());
        assert!(validate_starting_cash(-1, 500_000).is_err());
        assert!(validate_starting_cash(500_001, 500_000).is_err());
    }

    #[test]
    fn test_validate_drawer_amount() {
        assert!(validate_drawer_amount("final_cash_drawer", 0).is_ok());
        assert!(validate_drawer_amount("final_cash_drawer", -50).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_requested_units() {
        assert!(validate_requested_units(0.25).is_ok());
        assert!(validate_requested_units(0.0).is_err());
        assert!(validate_requested_units(f64::NAN).is_err());
        assert!(validate_requested_units(f64::INFINITY).is_err());
    }
}
