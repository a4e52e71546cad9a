//! # Domain Types
//!
//! Core domain types used throughout Orchard POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Time tracking                   Cash handling                          │
//! │  ┌─────────────────┐             ┌─────────────────┐                    │
//! │  │   ClockEvent    │──creates──► │  RegisterShift  │                    │
//! │  │   WorkShift     │◄──binds───  │  (per terminal) │                    │
//! │  │   Break         │             └─────────────────┘                    │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  Inventory                       Settlement                             │
//! │  ┌─────────────────┐             ┌─────────────────┐                    │
//! │  │   Product       │             │  CartSession    │                    │
//! │  │   Batch         │──sold via─► │  Transaction    │                    │
//! │  │   StockMovement │             │  TransactionItem│                    │
//! │  └─────────────────┘             └─────────────────┘                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (sku, batch_number) - human-readable
//!
//! ## Snapshot Contract
//! Every read path hands out owned copies of these types. Nothing in the
//! engine aliases shared mutable entity state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Clock Events
// =============================================================================

/// Direction of a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClockEventType {
    /// Start of a work shift.
    In,
    /// End of a work shift.
    Out,
}

/// How a clock event was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClockMethod {
    /// Created as part of login/logout.
    Login,
    /// Explicit action by the employee.
    Manual,
    /// Created by the cascade orchestrator.
    Auto,
    /// Forced by a manager.
    Manager,
}

/// Review status of a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClockEventStatus {
    Pending,
    Confirmed,
    Disputed,
}

/// An append-only clock-in/clock-out record.
///
/// Immutable once created. Auto-generated events (forced clock-outs) carry
/// `method = Auto` so payroll review can tell them apart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ClockEvent {
    pub id: String,
    pub employee_id: String,
    pub terminal_id: String,
    pub event_type: ClockEventType,
    pub method: ClockMethod,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub status: ClockEventStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Work Shifts
// =============================================================================

/// Lifecycle of a work shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WorkShiftStatus {
    /// Employee is clocked in.
    Active,
    /// Clock-out event attached; terminal state.
    Completed,
}

/// An employee's clocked-in work period, independent of which register
/// they operate.
///
/// ## Invariant
/// At most one `Active` WorkShift per employee at any time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WorkShift {
    pub id: String,
    pub employee_id: String,
    pub business_id: String,
    pub clock_in_event_id: String,
    pub clock_out_event_id: Option<String>,
    pub schedule_id: Option<String>,
    pub status: WorkShiftStatus,
    /// Worked hours net of unpaid breaks; set on completion.
    pub total_hours: Option<f64>,
    /// Hours beyond the standard day; set on completion.
    pub overtime_hours: Option<f64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl WorkShift {
    /// Checks whether the shift is still running.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == WorkShiftStatus::Active
    }
}

// =============================================================================
// Breaks
// =============================================================================

/// Lifecycle of a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BreakStatus {
    Active,
    Completed,
}

/// A break within a work shift.
///
/// ## Invariant
/// At most one `Active` break per WorkShift. Must be closed before the
/// owning shift can clock out; the cascade closes dangling breaks itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Break {
    pub id: String,
    pub shift_id: String,
    /// Free-form kind label ("meal", "rest", ...).
    pub break_type: String,
    /// Paid breaks do not reduce worked hours.
    pub is_paid: bool,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: BreakStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Break {
    /// Break duration in fractional hours, if the break has ended.
    pub fn duration_hours(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds() as f64 / 3600.0)
    }
}

// =============================================================================
// Register Shifts
// =============================================================================

/// Lifecycle of a register (cash-handling) shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegisterShiftStatus {
    Active,
    /// Terminal state; counters and variance are frozen.
    Ended,
}

/// A cash-handling session on a specific POS terminal, nested within a
/// WorkShift (`time_shift_id` binds them).
///
/// ## Invariants
/// - `starting_cash_cents` is validated against `0..=ceiling` at open
/// - May only be opened while the owner has an `Active` WorkShift
/// - One `Active` shift per cashier per calendar day on a given device
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RegisterShift {
    pub id: String,
    /// The WorkShift this register shift is nested in.
    pub time_shift_id: String,
    pub cashier_id: String,
    pub business_id: String,
    pub device_id: Option<String>,
    pub schedule_id: Option<String>,
    pub status: RegisterShiftStatus,
    pub starting_cash_cents: i64,
    pub final_cash_drawer_cents: Option<i64>,
    pub expected_cash_drawer_cents: Option<i64>,
    /// `final - expected`; negative means the drawer came up short.
    pub cash_variance_cents: Option<i64>,
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    pub total_refunds_cents: i64,
    pub total_voids: i64,
    /// Set when the shift was force-ended by the sweep or logout cascade.
    pub auto_closed: bool,
    /// Pending manager review (large variance or forced end).
    pub needs_reconciliation: bool,
    pub reconciled_amount_cents: Option<i64>,
    pub reconciled_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub reconciled_at: Option<DateTime<Utc>>,
    /// Scheduled end used by the stale-shift sweep; None means unscheduled.
    #[ts(as = "Option<String>")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub ended_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl RegisterShift {
    /// Checks whether the shift is still open.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == RegisterShiftStatus::Active
    }

    /// Starting cash as Money.
    #[inline]
    pub fn starting_cash(&self) -> Money {
        Money::from_cents(self.starting_cash_cents)
    }

    /// Cash variance as Money, if the shift has ended.
    #[inline]
    pub fn cash_variance(&self) -> Option<Money> {
        self.cash_variance_cents.map(Money::from_cents)
    }

    /// Drawer estimate used when force-closing: starting cash plus sales.
    #[inline]
    pub fn estimated_drawer(&self) -> Money {
        Money::from_cents(self.starting_cash_cents + self.total_sales_cents)
    }
}

// =============================================================================
// Products
// =============================================================================

/// Batch rotation policy for picking stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RotationMethod {
    /// First-Expired-First-Out: earliest expiry date sells first.
    Fefo,
    /// First-In-First-Out: earliest receipt sells first.
    Fifo,
    /// No rotation preference; receipt order is used as a stable default.
    None,
}

/// A catalog product, reduced to what settlement and allocation need.
///
/// Catalog CRUD lives outside this engine; the fields here are the ones the
/// settlement path reads (inventory tracking, weight pricing, rotation).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category_id: Option<String>,
    pub price_cents: i64,
    /// Whether sales decrement stock for this product.
    pub track_inventory: bool,
    /// Priced and sold by weight rather than unit count.
    pub sold_by_weight: bool,
    /// Default rotation policy when allocating batches.
    pub rotation_method: RotationMethod,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Batches & Stock Movements
// =============================================================================

/// Lifecycle of an inventory batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Sellable.
    Active,
    /// Expiry date passed; flipped by the background sweep.
    Expired,
    /// Quantity reached zero through recorded movements.
    SoldOut,
    /// Manually pulled from sale.
    Removed,
}

/// A received lot of perishable stock.
///
/// `current_quantity` only decreases via recorded StockMovements; batch
/// selection itself never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    pub batch_number: String,
    /// None for non-perishable lots tracked only for recall purposes.
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
    pub initial_quantity: f64,
    pub current_quantity: f64,
    pub status: BatchStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Whether this batch can supply stock on the given day.
    pub fn is_sellable(&self, today: NaiveDate) -> bool {
        self.status == BatchStatus::Active
            && self.current_quantity > 0.0
            && self.expiry_date.map_or(true, |exp| exp >= today)
    }
}

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock received into a batch.
    Receipt,
    /// Decrement at transaction commit (the sole sale-path mutator).
    Sale,
    /// Manual or compensating correction (e.g., void reversal).
    Adjustment,
}

/// An audit record of a quantity change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub batch_id: Option<String>,
    pub movement_type: MovementType,
    /// Positive for receipts/adjustments in, negative for sales.
    pub quantity: f64,
    pub transaction_id: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transactions
// =============================================================================

/// Kind of financial transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Sale,
    /// Partial or full return against an original sale.
    Refund,
    /// Cancels an original sale outright.
    Void,
}

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Voided,
}

/// Payment method recorded on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    ExternalCard,
}

/// A committed sale, refund, or void.
///
/// Refunds and voids always reference `original_transaction_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// The RegisterShift this transaction was rung up on.
    pub shift_id: String,
    pub business_id: String,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub original_transaction_id: Option<String>,
    pub void_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a transaction.
///
/// Uses the snapshot pattern: name and unit price are frozen at commit time.
/// Weighed goods carry `weight`; unit goods carry `quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: Option<String>,
    pub category_id: Option<String>,
    /// Name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    pub weight: Option<f64>,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Batch the stock was drawn from, when a single batch covered the line.
    pub batch_id: Option<String>,
    /// Cumulative units refunded against this line across all refunds.
    pub refunded_quantity: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    /// Units sold: weight for weighed goods, count otherwise.
    #[inline]
    pub fn units(&self) -> f64 {
        self.weight.unwrap_or(self.quantity as f64)
    }

    /// Units still eligible for refund.
    ///
    /// ## Invariant
    /// `refunded_quantity` never exceeds the original units, so this is
    /// never negative.
    #[inline]
    pub fn remaining_refundable(&self) -> f64 {
        self.units() - self.refunded_quantity
    }
}

// =============================================================================
// Cart Sessions
// =============================================================================

/// Lifecycle of a cart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    /// A transaction was committed from this cart.
    Completed,
    Cancelled,
}

/// Ephemeral pre-transaction staging area.
///
/// The only mutable aggregate before a Transaction is committed; it is
/// discarded (status flips) once settlement creates a Transaction from it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartSession {
    pub id: String,
    pub cashier_id: String,
    pub shift_id: Option<String>,
    pub status: CartStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line staged in a cart, already priced by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub id: String,
    pub cart_session_id: String,
    pub product_id: Option<String>,
    /// Category fallback for open-department rings without a product.
    pub category_id: Option<String>,
    pub name_snapshot: String,
    pub quantity: i64,
    pub weight: Option<f64>,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub tax_cents: i64,
    /// Pre-selected batch from the allocation engine, if any.
    pub batch_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// A line must reference a product or, failing that, a category.
    #[inline]
    pub fn has_valid_reference(&self) -> bool {
        self.product_id.is_some() || self.category_id.is_some()
    }

    /// Units staged: weight for weighed goods, count otherwise.
    #[inline]
    pub fn units(&self) -> f64 {
        self.weight.unwrap_or(self.quantity as f64)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_sellable() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut batch = Batch {
            id: "b1".to_string(),
            product_id: "p1".to_string(),
            batch_number: "LOT-1".to_string(),
            expiry_date: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            received_at: Utc::now(),
            initial_quantity: 10.0,
            current_quantity: 4.0,
            status: BatchStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(batch.is_sellable(today));

        batch.status = BatchStatus::SoldOut;
        assert!(!batch.is_sellable(today));

        batch.status = BatchStatus::Active;
        batch.expiry_date = Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(!batch.is_sellable(today));

        // Undated batches never expire
        batch.expiry_date = None;
        assert!(batch.is_sellable(today));
    }

    #[test]
    fn test_item_units_prefers_weight() {
        let item = TransactionItem {
            id: "i1".to_string(),
            transaction_id: "t1".to_string(),
            product_id: Some("p1".to_string()),
            category_id: None,
            name_snapshot: "Gala apples".to_string(),
            quantity: 1,
            weight: Some(1.42),
            unit_price_cents: 399,
            line_total_cents: 567,
            batch_id: None,
            refunded_quantity: 0.0,
            created_at: Utc::now(),
        };
        assert!((item.units() - 1.42).abs() < f64::EPSILON);
        assert!((item.remaining_refundable() - 1.42).abs() < f64::EPSILON);
    }

    #[test]
    fn test_break_duration() {
        let start = Utc::now();
        let brk = Break {
            id: "br1".to_string(),
            shift_id: "s1".to_string(),
            break_type: "meal".to_string(),
            is_paid: false,
            start_time: start,
            end_time: Some(start + chrono::Duration::minutes(30)),
            status: BreakStatus::Completed,
            created_at: start,
        };
        assert!((brk.duration_hours().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_estimated_drawer() {
        let shift = RegisterShift {
            id: "rs1".to_string(),
            time_shift_id: "ws1".to_string(),
            cashier_id: "emp1".to_string(),
            business_id: "biz".to_string(),
            device_id: Some("pos-01".to_string()),
            schedule_id: None,
            status: RegisterShiftStatus::Active,
            starting_cash_cents: 5000,
            final_cash_drawer_cents: None,
            expected_cash_drawer_cents: None,
            cash_variance_cents: None,
            total_sales_cents: 12345,
            total_transactions: 7,
            total_refunds_cents: 0,
            total_voids: 0,
            auto_closed: false,
            needs_reconciliation: false,
            reconciled_amount_cents: None,
            reconciled_by: None,
            reconciled_at: None,
            scheduled_end: None,
            opened_at: Utc::now(),
            ended_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(shift.estimated_drawer().cents(), 17345);
    }

    #[test]
    fn test_cart_item_reference_check() {
        let item = CartItem {
            id: "c1".to_string(),
            cart_session_id: "cs1".to_string(),
            product_id: None,
            category_id: None,
            name_snapshot: "Misc".to_string(),
            quantity: 1,
            weight: None,
            unit_price_cents: 100,
            line_total_cents: 100,
            tax_cents: 0,
            batch_id: None,
            created_at: Utc::now(),
        };
        assert!(!item.has_valid_reference());
    }
}
