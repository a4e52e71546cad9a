//! # Operation Error Types
//!
//! Unified error type for the orchestration layer.
//!
//! ## Error Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    OpsError → ErrorKind                                 │
//! │                                                                         │
//! │  Validation        bad input shape/range - caller's fault,             │
//! │                    not retryable                                        │
//! │  StateConflict     entity not in the required state - re-read state    │
//! │                    before retrying                                      │
//! │  NotFound          referenced entity does not exist                     │
//! │  InsufficientStock warning-level; the sale path never blocks on it     │
//! │  Compensation      a compensating void ran (or failed) - surfaced      │
//! │                    loudly, never auto-retried                           │
//! │  Internal          database/infrastructure failure                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The UI shell serializes `kind()` + the display message; messages are
//! written to be shown to the operator as-is.

use serde::Serialize;
use thiserror::Error;

use orchard_core::{CoreError, ValidationError};
use orchard_db::DbError;

// =============================================================================
// Ops Error
// =============================================================================

/// Errors surfaced by the operation entry points.
#[derive(Debug, Error)]
pub enum OpsError {
    // -------------------------------------------------------------------------
    // Time tracking
    // -------------------------------------------------------------------------
    /// Employee already has an active work shift.
    #[error("Employee {employee_id} already has an active shift ({shift_id})")]
    AlreadyClockedIn {
        employee_id: String,
        shift_id: String,
    },

    /// No active work shift for the employee.
    #[error("No active work shift for employee {employee_id}")]
    NoActiveShift { employee_id: String },

    /// A break is already running on the shift.
    #[error("A break is already running on shift {shift_id}")]
    BreakAlreadyActive { shift_id: String },

    /// No break is running on the shift.
    #[error("No active break on shift {shift_id}")]
    NoActiveBreak { shift_id: String },

    // -------------------------------------------------------------------------
    // Register shifts
    // -------------------------------------------------------------------------
    /// Register shift requested without an active work shift.
    #[error("Cashier {cashier_id} is not clocked in")]
    NotClockedIn { cashier_id: String },

    /// The cashier has an active register shift on another device.
    #[error("You already have an active shift running on another device ({device})")]
    ShiftActiveElsewhere { cashier_id: String, device: String },

    /// The cashier already has an active register shift on this device.
    #[error("A register shift is already open on this device ({shift_id})")]
    ShiftAlreadyOpen {
        cashier_id: String,
        shift_id: String,
    },

    /// The register shift is not active (e.g. ending an ended shift).
    #[error("Register shift {shift_id} is not active")]
    ShiftNotActive { shift_id: String },

    /// Reconciliation requested on a shift that is not flagged for review.
    #[error("Register shift {shift_id} is not pending reconciliation")]
    ReconciliationNotRequired { shift_id: String },

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------
    /// A concurrent operation on the same entity is still in flight
    /// (e.g. a double-tapped "complete sale").
    #[error("Another operation is already running for {entity} {id}")]
    AlreadyProcessing { entity: &'static str, id: String },

    // -------------------------------------------------------------------------
    // Settlement
    // -------------------------------------------------------------------------
    /// The cart has no items.
    #[error("Cart {cart_id} has no items")]
    EmptyCart { cart_id: String },

    /// A cart line references neither a product nor a category.
    #[error("Cart {cart_id} item {item_id} references neither a product nor a category")]
    InvalidCartItem { cart_id: String, item_id: String },

    /// The cart session is no longer active.
    #[error("Cart {cart_id} is not active")]
    CartNotActive { cart_id: String },

    /// The cart session is not bound to a register shift.
    #[error("Cart {cart_id} is not bound to a register shift")]
    CartWithoutShift { cart_id: String },

    /// Refund validation failed (re-checked inside the operation).
    #[error("Refund rejected: {}", errors.join("; "))]
    RefundRejected { errors: Vec<String> },

    /// Void validation failed (re-checked inside the operation).
    #[error("Void rejected: {}", errors.join("; "))]
    VoidRejected { errors: Vec<String> },

    /// The transaction is already voided.
    #[error("Transaction {transaction_id} is already voided")]
    AlreadyVoided { transaction_id: String },

    /// Policy requires a manager to approve this operation.
    #[error("Manager approval is required for transaction {transaction_id}")]
    ManagerApprovalRequired { transaction_id: String },

    /// Cart completion failed after the transaction was committed; the sale
    /// was voided automatically.
    #[error(
        "Sale {transaction_id} could not be finalized and was voided automatically; \
         please contact support"
    )]
    CartCompletionFailed { transaction_id: String },

    /// The compensating void itself failed. A completed sale exists with an
    /// unfinished cart; manual reconciliation is required.
    #[error(
        "Automatic void of transaction {transaction_id} failed; manual reconciliation \
         required, please contact support"
    )]
    CompensationFailed {
        transaction_id: String,
        #[source]
        source: Box<DbError>,
    },

    // -------------------------------------------------------------------------
    // Cascade
    // -------------------------------------------------------------------------
    /// Some register shifts could not be closed, so the automatic clock-out
    /// was skipped; the work shift is left active.
    #[error(
        "Could not close register shifts {failed_shift_ids:?} for work shift \
         {work_shift_id}; clock-out skipped"
    )]
    CascadeIncomplete {
        work_shift_id: String,
        failed_shift_ids: Vec<String>,
    },

    // -------------------------------------------------------------------------
    // Lookups & wrapped layers
    // -------------------------------------------------------------------------
    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Core business rule failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for OpsError {
    fn from(err: ValidationError) -> Self {
        OpsError::Core(CoreError::Validation(err))
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification handed to the UI shell alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    StateConflict,
    NotFound,
    InsufficientStock,
    Compensation,
    Internal,
}

impl OpsError {
    /// Classifies the error per the propagation policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpsError::AlreadyClockedIn { .. }
            | OpsError::NoActiveShift { .. }
            | OpsError::BreakAlreadyActive { .. }
            | OpsError::NoActiveBreak { .. }
            | OpsError::NotClockedIn { .. }
            | OpsError::ShiftActiveElsewhere { .. }
            | OpsError::ShiftAlreadyOpen { .. }
            | OpsError::ShiftNotActive { .. }
            | OpsError::ReconciliationNotRequired { .. }
            | OpsError::AlreadyProcessing { .. }
            | OpsError::CartNotActive { .. }
            | OpsError::AlreadyVoided { .. }
            | OpsError::ManagerApprovalRequired { .. }
            | OpsError::CascadeIncomplete { .. } => ErrorKind::StateConflict,

            OpsError::EmptyCart { .. }
            | OpsError::InvalidCartItem { .. }
            | OpsError::CartWithoutShift { .. }
            | OpsError::RefundRejected { .. }
            | OpsError::VoidRejected { .. } => ErrorKind::Validation,

            OpsError::CartCompletionFailed { .. } | OpsError::CompensationFailed { .. } => {
                ErrorKind::Compensation
            }

            OpsError::NotFound { .. } => ErrorKind::NotFound,

            OpsError::Core(core) => match core {
                CoreError::NoStockAvailable { .. } => ErrorKind::InsufficientStock,
                CoreError::InvalidClockSequence { .. } => ErrorKind::StateConflict,
                CoreError::Validation(_) => ErrorKind::Validation,
            },

            OpsError::Db(db) => match db {
                DbError::NotFound { .. } => ErrorKind::NotFound,
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                    ErrorKind::StateConflict
                }
                _ => ErrorKind::Internal,
            },
        }
    }
}

/// Result type for operation entry points.
pub type OpsResult<T> = Result<T, OpsError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conflicts_classify() {
        let err = OpsError::NoActiveShift {
            employee_id: "emp-1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::StateConflict);

        let err = OpsError::AlreadyProcessing {
            entity: "cart",
            id: "c-1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_compensation_classifies() {
        let err = OpsError::CompensationFailed {
            transaction_id: "tx-1".to_string(),
            source: Box::new(DbError::QueryFailed("disk full".to_string())),
        };
        assert_eq!(err.kind(), ErrorKind::Compensation);
        assert!(err.to_string().contains("contact support"));
    }

    #[test]
    fn test_stock_errors_classify() {
        let err = OpsError::Core(CoreError::NoStockAvailable {
            product_id: "p-1".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    }

    #[test]
    fn test_elsewhere_message_is_actionable() {
        let err = OpsError::ShiftActiveElsewhere {
            cashier_id: "emp-1".to_string(),
            device: "pos-02".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "You already have an active shift running on another device (pos-02)"
        );
    }
}
