//! # Settlement Service
//!
//! Commits a cart into a transaction, and handles refunds, voids, and batch
//! selection.
//!
//! ## Cart Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_from_cart                                     │
//! │                                                                         │
//! │  1. Load cart + items (EmptyCart / InvalidCartItem fail here,           │
//! │     with nothing to undo)                                               │
//! │  2. Sum subtotal/tax/total (items are already priced by the caller;     │
//! │     settlement does not re-price)                                       │
//! │  3. Insert Transaction + TransactionItems  ── one durable write         │
//! │  4. Record sale StockMovements             ── warnings only, never      │
//! │     fatal; stock may go negative by policy                              │
//! │  5. Mark CartSession completed                                          │
//! │     └── on failure: compensating VOID of the step-3 transaction,        │
//! │         then surface an error directing the operator to support.        │
//! │         The void is not retried; a failed void is the one loudly        │
//! │         surfaced Compensation condition.                                │
//! │  6. Bump register-shift counters (so a compensated sale never           │
//! │     touches them)                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Refund and void eligibility checks are pure reads; `create_refund` and
//! `void_transaction` re-run them inside the operation and fail closed if
//! state changed since the caller's check.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use orchard_core::{
    allocation, validation, AllocationOutcome, CartItem, MovementType, PaymentMethod,
    RotationMethod, StockMovement, Transaction, TransactionItem, TransactionStatus,
    TransactionType, DEFAULT_BUSINESS_ID,
};
use orchard_db::{Database, DbError};

use crate::error::{OpsError, OpsResult};
use crate::guard::OpGuard;
use crate::notify::{AlertSink, ManagerAlert};
use crate::time::TimeSource;

// =============================================================================
// DTOs
// =============================================================================

/// Result of a refund/void eligibility check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub requires_manager_approval: bool,
}

/// One line of a refund request.
#[derive(Debug, Clone)]
pub struct RefundItemRequest {
    /// The original TransactionItem being refunded against.
    pub item_id: String,
    /// Units (or weight) to refund.
    pub units: f64,
}

// =============================================================================
// Service
// =============================================================================

/// Transaction settlement service.
#[derive(Clone)]
pub struct SettlementService {
    db: Database,
    clock: Arc<dyn TimeSource>,
    guard: OpGuard,
    sink: Arc<dyn AlertSink>,
}

impl SettlementService {
    /// Creates a new SettlementService.
    pub fn new(
        db: Database,
        clock: Arc<dyn TimeSource>,
        guard: OpGuard,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        SettlementService {
            db,
            clock,
            guard,
            sink,
        }
    }

    // -------------------------------------------------------------------------
    // Batch selection
    // -------------------------------------------------------------------------

    /// Selects batches for a sale line, read-only.
    ///
    /// Uses the product's default rotation method unless overridden.
    /// Quantity is decremented only at transaction commit, never here.
    pub async fn select_batches_for_sale(
        &self,
        product_id: &str,
        requested_units: f64,
        rotation: Option<RotationMethod>,
        allow_partial: bool,
    ) -> OpsResult<AllocationOutcome> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })?;

        let batches = self.db.batches().list_active_for_product(product_id).await?;
        let rotation = rotation.unwrap_or(product.rotation_method);

        Ok(allocation::allocate(
            product_id,
            &batches,
            requested_units,
            rotation,
            allow_partial,
            self.clock.today(),
        )?)
    }

    // -------------------------------------------------------------------------
    // Cart commit
    // -------------------------------------------------------------------------

    /// Commits the cart into a completed sale transaction.
    pub async fn create_from_cart(
        &self,
        cart_session_id: &str,
        payment_method: PaymentMethod,
    ) -> OpsResult<Transaction> {
        validation::validate_entity_id("cart_session_id", cart_session_id)?;

        let _token = self.guard.try_acquire("cart", cart_session_id)?;
        debug!(cart_session_id = %cart_session_id, "create_from_cart");

        // Step 1: load and validate; nothing to undo on failure here.
        let session = self
            .db
            .carts()
            .get_session(cart_session_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "CartSession",
                id: cart_session_id.to_string(),
            })?;

        if session.status != orchard_core::CartStatus::Active {
            return Err(OpsError::CartNotActive {
                cart_id: cart_session_id.to_string(),
            });
        }

        let shift_id = session.shift_id.clone().ok_or_else(|| OpsError::CartWithoutShift {
            cart_id: cart_session_id.to_string(),
        })?;

        let items = self.db.carts().list_items(cart_session_id).await?;
        if items.is_empty() {
            return Err(OpsError::EmptyCart {
                cart_id: cart_session_id.to_string(),
            });
        }
        for item in &items {
            if !item.has_valid_reference() {
                return Err(OpsError::InvalidCartItem {
                    cart_id: cart_session_id.to_string(),
                    item_id: item.id.clone(),
                });
            }
            // Weighed lines carry their amount in `weight`; unit lines must
            // hold a sane count.
            if item.weight.is_none() {
                validation::validate_quantity(item.quantity)?;
            }
        }

        // The sale must land on a shift that is still open.
        let register_shift = self
            .db
            .registers()
            .get_by_id(&shift_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "RegisterShift",
                id: shift_id.clone(),
            })?;
        if !register_shift.is_active() {
            return Err(OpsError::ShiftNotActive {
                shift_id: shift_id.clone(),
            });
        }

        // Step 2: sums only; line items arrive priced.
        let subtotal: i64 = items.iter().map(|i| i.line_total_cents).sum();
        let tax: i64 = items.iter().map(|i| i.tax_cents).sum();
        let total = subtotal + tax;

        let now = self.clock.now();
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            shift_id: shift_id.clone(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            tx_type: TransactionType::Sale,
            status: TransactionStatus::Completed,
            subtotal_cents: subtotal,
            tax_cents: tax,
            total_cents: total,
            payment_method,
            original_transaction_id: None,
            void_reason: None,
            created_at: now,
            updated_at: now,
            voided_at: None,
        };
        let tx_items: Vec<TransactionItem> = items
            .iter()
            .map(|i| TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                product_id: i.product_id.clone(),
                category_id: i.category_id.clone(),
                name_snapshot: i.name_snapshot.clone(),
                quantity: i.quantity,
                weight: i.weight,
                unit_price_cents: i.unit_price_cents,
                line_total_cents: i.line_total_cents,
                batch_id: i.batch_id.clone(),
                refunded_quantity: 0.0,
                created_at: now,
            })
            .collect();

        // Step 3: the durable write. Failure here has no side effects to undo.
        self.db
            .transactions()
            .insert_with_items(&transaction, &tx_items)
            .await?;

        // Step 4: inventory decrements; warnings only.
        self.record_sale_movements(&transaction.id, &items).await;

        // Step 5: completing the cart is the same logical unit as step 3.
        if let Err(cart_err) = self.db.carts().complete_session(cart_session_id, now).await {
            warn!(
                cart_session_id = %cart_session_id,
                transaction_id = %transaction.id,
                error = %cart_err,
                "Cart completion failed after transaction commit; issuing compensating void"
            );
            return Err(self
                .compensate_orphaned_transaction(
                    &transaction,
                    "cart completion failed (automatic void)",
                )
                .await
                .into());
        }

        // Step 6: counters last, so a compensated sale never reaches them.
        if let Err(e) = self
            .db
            .registers()
            .add_sale_totals(&shift_id, total, now)
            .await
        {
            warn!(shift_id = %shift_id, error = %e, "Failed to bump shift counters for sale");
        }

        info!(
            transaction_id = %transaction.id,
            shift_id = %shift_id,
            total = %transaction.total(),
            items = tx_items.len(),
            "Sale committed"
        );

        Ok(transaction)
    }

    // -------------------------------------------------------------------------
    // Refunds
    // -------------------------------------------------------------------------

    /// Read-only refund eligibility check.
    ///
    /// `create_refund` re-runs this internally; a check performed in a
    /// separate prior call is never trusted.
    pub async fn validate_refund_eligibility(
        &self,
        transaction_id: &str,
        refund_items: &[RefundItemRequest],
    ) -> OpsResult<EligibilityReport> {
        let transaction = self
            .db
            .transactions()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "Transaction",
                id: transaction_id.to_string(),
            })?;

        let mut errors = Vec::new();

        if transaction.tx_type != TransactionType::Sale {
            errors.push("only sales can be refunded".to_string());
        }
        match transaction.status {
            TransactionStatus::Completed => {}
            TransactionStatus::Voided => errors.push("transaction is voided".to_string()),
            TransactionStatus::Pending => errors.push("transaction is pending".to_string()),
        }
        if refund_items.is_empty() {
            errors.push("no refund items requested".to_string());
        }

        let originals = self.db.transactions().list_items(transaction_id).await?;
        let by_id: HashMap<&str, &TransactionItem> =
            originals.iter().map(|i| (i.id.as_str(), i)).collect();

        for req in refund_items {
            match by_id.get(req.item_id.as_str()) {
                None => errors.push(format!(
                    "item {} does not belong to transaction {}",
                    req.item_id, transaction_id
                )),
                Some(orig) => {
                    if !req.units.is_finite() || req.units <= 0.0 {
                        errors.push(format!(
                            "refund quantity for item {} must be positive",
                            req.item_id
                        ));
                    } else if req.units > orig.remaining_refundable() + 1e-9 {
                        errors.push(format!(
                            "refund quantity {} exceeds remaining {} for item {}",
                            req.units,
                            orig.remaining_refundable(),
                            req.item_id
                        ));
                    }
                }
            }
        }

        let requires_manager_approval = self.outside_open_shift(&transaction).await;

        Ok(EligibilityReport {
            is_valid: errors.is_empty(),
            errors,
            requires_manager_approval,
        })
    }

    /// Creates a refund transaction against an original sale.
    ///
    /// The refund is processed on `register_shift_id` (the operator's
    /// current, open register shift).
    pub async fn create_refund(
        &self,
        transaction_id: &str,
        refund_items: &[RefundItemRequest],
        register_shift_id: &str,
        manager_id: Option<&str>,
    ) -> OpsResult<Transaction> {
        let _token = self.guard.try_acquire("transaction", transaction_id)?;
        debug!(transaction_id = %transaction_id, items = refund_items.len(), "create_refund");

        // Re-validated inside the operation; state may have moved since the
        // caller's check.
        let report = self
            .validate_refund_eligibility(transaction_id, refund_items)
            .await?;
        if !report.is_valid {
            return Err(OpsError::RefundRejected {
                errors: report.errors,
            });
        }
        if report.requires_manager_approval && manager_id.is_none() {
            return Err(OpsError::ManagerApprovalRequired {
                transaction_id: transaction_id.to_string(),
            });
        }

        let processing_shift = self
            .db
            .registers()
            .get_by_id(register_shift_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "RegisterShift",
                id: register_shift_id.to_string(),
            })?;
        if !processing_shift.is_active() {
            return Err(OpsError::ShiftNotActive {
                shift_id: register_shift_id.to_string(),
            });
        }

        let original = self
            .db
            .transactions()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "Transaction",
                id: transaction_id.to_string(),
            })?;
        let originals = self.db.transactions().list_items(transaction_id).await?;
        let by_id: HashMap<&str, &TransactionItem> =
            originals.iter().map(|i| (i.id.as_str(), i)).collect();

        let now = self.clock.now();
        let mut subtotal: i64 = 0;
        let refund_id = Uuid::new_v4().to_string();
        let mut lines = Vec::with_capacity(refund_items.len());
        for req in refund_items {
            // Membership validated above; fail closed if the item is gone.
            let Some(&orig) = by_id.get(req.item_id.as_str()) else {
                return Err(OpsError::RefundRejected {
                    errors: vec![format!(
                        "item {} does not belong to transaction {}",
                        req.item_id, transaction_id
                    )],
                });
            };
            let line_total = (orig.unit_price_cents as f64 * req.units).round() as i64;
            subtotal += line_total;

            let weighed = orig.weight.is_some();
            lines.push(TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: refund_id.clone(),
                product_id: orig.product_id.clone(),
                category_id: orig.category_id.clone(),
                name_snapshot: orig.name_snapshot.clone(),
                quantity: if weighed { orig.quantity } else { req.units.round() as i64 },
                weight: if weighed { Some(req.units) } else { None },
                unit_price_cents: orig.unit_price_cents,
                line_total_cents: line_total,
                batch_id: orig.batch_id.clone(),
                refunded_quantity: 0.0,
                created_at: now,
            });
        }

        // Tax refunded proportionally to the refunded share of the sale.
        let tax = if original.subtotal_cents > 0 {
            ((subtotal as i128 * original.tax_cents as i128) / original.subtotal_cents as i128)
                as i64
        } else {
            0
        };
        let total = subtotal + tax;

        let refund = Transaction {
            id: refund_id,
            shift_id: register_shift_id.to_string(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            tx_type: TransactionType::Refund,
            status: TransactionStatus::Completed,
            subtotal_cents: subtotal,
            tax_cents: tax,
            total_cents: total,
            payment_method: original.payment_method,
            original_transaction_id: Some(transaction_id.to_string()),
            void_reason: None,
            created_at: now,
            updated_at: now,
            voided_at: None,
        };

        self.db.transactions().insert_with_items(&refund, &lines).await?;

        // Consume refundable quantity on the originals, all or nothing. On a
        // lost race the refund record is voided and the call fails closed.
        let updates: Vec<(String, f64)> = refund_items
            .iter()
            .map(|r| (r.item_id.clone(), r.units))
            .collect();
        match self.db.transactions().add_refunded_quantities(&updates).await {
            Ok(()) => {}
            Err(DbError::NotFound { id, .. }) => {
                return Err(self
                    .compensate_orphaned_transaction(
                        &refund,
                        "refundable quantity no longer available (automatic void)",
                    )
                    .await
                    .into_refund_rejection(id));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self
            .db
            .registers()
            .add_refund_totals(register_shift_id, total, now)
            .await
        {
            warn!(shift_id = %register_shift_id, error = %e, "Failed to bump shift counters for refund");
        }

        info!(
            refund_id = %refund.id,
            original = %transaction_id,
            total = %refund.total(),
            "Refund committed"
        );

        Ok(refund)
    }

    // -------------------------------------------------------------------------
    // Voids
    // -------------------------------------------------------------------------

    /// Read-only void eligibility check.
    pub async fn validate_void_eligibility(
        &self,
        transaction_id: &str,
    ) -> OpsResult<EligibilityReport> {
        let transaction = self
            .db
            .transactions()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "Transaction",
                id: transaction_id.to_string(),
            })?;

        let mut errors = Vec::new();
        if transaction.tx_type != TransactionType::Sale {
            errors.push("only sales can be voided".to_string());
        }
        match transaction.status {
            TransactionStatus::Completed => {}
            TransactionStatus::Voided => errors.push("transaction is already voided".to_string()),
            TransactionStatus::Pending => errors.push("transaction is pending".to_string()),
        }

        // Policy: voiding outside the shift the sale was rung on needs a
        // manager.
        let requires_manager_approval = self.outside_open_shift(&transaction).await;

        Ok(EligibilityReport {
            is_valid: errors.is_empty(),
            errors,
            requires_manager_approval,
        })
    }

    /// Voids a completed sale, reversing its stock movements.
    pub async fn void_transaction(
        &self,
        transaction_id: &str,
        reason: Option<&str>,
        manager_id: Option<&str>,
    ) -> OpsResult<Transaction> {
        let _token = self.guard.try_acquire("transaction", transaction_id)?;
        debug!(transaction_id = %transaction_id, "void_transaction");

        let transaction = self
            .db
            .transactions()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "Transaction",
                id: transaction_id.to_string(),
            })?;

        if transaction.status == TransactionStatus::Voided {
            return Err(OpsError::AlreadyVoided {
                transaction_id: transaction_id.to_string(),
            });
        }

        // Re-validated inside the operation.
        let report = self.validate_void_eligibility(transaction_id).await?;
        if !report.is_valid {
            return Err(OpsError::VoidRejected {
                errors: report.errors,
            });
        }
        if report.requires_manager_approval && manager_id.is_none() {
            return Err(OpsError::ManagerApprovalRequired {
                transaction_id: transaction_id.to_string(),
            });
        }

        let now = self.clock.now();
        let reason = reason.unwrap_or("voided by operator");
        match self.db.transactions().mark_voided(transaction_id, reason, now).await {
            Ok(()) => {}
            // Guarded transition: a racing void got there first.
            Err(DbError::NotFound { .. }) => {
                return Err(OpsError::AlreadyVoided {
                    transaction_id: transaction_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        self.reverse_stock_movements(transaction_id).await;

        if let Err(e) = self
            .db
            .registers()
            .add_void_count(&transaction.shift_id, now)
            .await
        {
            // The owning shift may have ended since the sale; the void still
            // stands.
            warn!(shift_id = %transaction.shift_id, error = %e, "Failed to bump shift void counter");
        }

        info!(transaction_id = %transaction_id, reason = %reason, "Transaction voided");

        self.db
            .transactions()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "Transaction",
                id: transaction_id.to_string(),
            })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Whether the transaction's register shift is no longer open.
    async fn outside_open_shift(&self, transaction: &Transaction) -> bool {
        match self.db.registers().get_by_id(&transaction.shift_id).await {
            Ok(Some(shift)) => !shift.is_active(),
            _ => true,
        }
    }

    /// Records sale movements for every inventory-tracked line.
    ///
    /// Failures are warnings: a broken inventory decrement must never undo a
    /// completed sale, and stock is allowed to go negative by policy.
    async fn record_sale_movements(&self, transaction_id: &str, items: &[CartItem]) {
        let now = self.clock.now();

        for item in items {
            let Some(product_id) = &item.product_id else { continue };

            let product = match self.db.products().get_by_id(product_id).await {
                Ok(Some(p)) => p,
                Ok(None) => {
                    warn!(product_id = %product_id, "Sale line references unknown product; skipping movement");
                    continue;
                }
                Err(e) => {
                    warn!(product_id = %product_id, error = %e, "Product lookup failed; skipping movement");
                    continue;
                }
            };
            if !product.track_inventory {
                continue;
            }

            let units = item.units();
            let movement = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: product_id.clone(),
                batch_id: item.batch_id.clone(),
                movement_type: MovementType::Sale,
                quantity: -units,
                transaction_id: Some(transaction_id.to_string()),
                note: None,
                created_at: now,
            };

            let result = match &item.batch_id {
                Some(batch_id) => {
                    if let Ok(Some(batch)) = self.db.batches().get_by_id(batch_id).await {
                        if batch.current_quantity < units {
                            warn!(
                                batch_id = %batch_id,
                                available = batch.current_quantity,
                                requested = units,
                                "Insufficient stock; sale proceeds, stock goes negative"
                            );
                        }
                    }
                    self.db
                        .batches()
                        .apply_sale_decrement(batch_id, units, &movement, now)
                        .await
                }
                None => self.db.batches().insert_movement(&movement).await,
            };

            if let Err(e) = result {
                warn!(
                    transaction_id = %transaction_id,
                    product_id = %product_id,
                    error = %e,
                    "Inventory decrement failed; sale stands, manual correction needed"
                );
            }
        }
    }

    /// Reverses the sale movements of a transaction with compensating
    /// adjustments. Warnings only.
    async fn reverse_stock_movements(&self, transaction_id: &str) {
        let movements = match self
            .db
            .batches()
            .list_movements_for_transaction(transaction_id)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                warn!(transaction_id = %transaction_id, error = %e, "Could not list movements for reversal");
                return;
            }
        };

        let now = self.clock.now();
        for movement in movements
            .iter()
            .filter(|m| m.movement_type == MovementType::Sale)
        {
            let units = -movement.quantity;
            let adjustment = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: movement.product_id.clone(),
                batch_id: movement.batch_id.clone(),
                movement_type: MovementType::Adjustment,
                quantity: units,
                transaction_id: Some(transaction_id.to_string()),
                note: Some("void reversal".to_string()),
                created_at: now,
            };

            let result = match &movement.batch_id {
                Some(batch_id) => {
                    self.db
                        .batches()
                        .apply_adjustment(batch_id, units, &adjustment, now)
                        .await
                }
                None => self.db.batches().insert_movement(&adjustment).await,
            };

            if let Err(e) = result {
                warn!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Stock reversal failed; manual correction needed"
                );
            }
        }
    }

    /// Issues the compensating void for a transaction whose follow-up step
    /// failed, and classifies the outcome.
    ///
    /// Not retried: retrying a non-idempotent follow-up risks
    /// double-compensation. A failed void is surfaced as the one loud
    /// Compensation condition.
    async fn compensate_orphaned_transaction(
        &self,
        transaction: &Transaction,
        reason: &str,
    ) -> CompensationOutcome {
        let now = self.clock.now();

        match self
            .db
            .transactions()
            .mark_voided(&transaction.id, reason, now)
            .await
        {
            Ok(()) => {
                self.reverse_stock_movements(&transaction.id).await;
                info!(transaction_id = %transaction.id, reason = %reason, "Compensating void issued");
                CompensationOutcome::Voided {
                    transaction_id: transaction.id.clone(),
                }
            }
            Err(db_err) => {
                error!(
                    transaction_id = %transaction.id,
                    error = %db_err,
                    "Compensating void FAILED; manual reconciliation required"
                );
                self.sink.alert(ManagerAlert::CompensationFailure {
                    transaction_id: transaction.id.clone(),
                    reason: db_err.to_string(),
                });
                CompensationOutcome::VoidFailed {
                    transaction_id: transaction.id.clone(),
                    source: db_err,
                }
            }
        }
    }
}

/// What the compensating void achieved.
enum CompensationOutcome {
    Voided { transaction_id: String },
    VoidFailed { transaction_id: String, source: DbError },
}

impl From<CompensationOutcome> for OpsError {
    fn from(outcome: CompensationOutcome) -> Self {
        match outcome {
            CompensationOutcome::Voided { transaction_id } => {
                OpsError::CartCompletionFailed { transaction_id }
            }
            CompensationOutcome::VoidFailed {
                transaction_id,
                source,
            } => OpsError::CompensationFailed {
                transaction_id,
                source: Box::new(source),
            },
        }
    }
}

impl CompensationOutcome {
    /// Refund flavor: a successfully compensated refund surfaces as a
    /// fail-closed rejection; a failed void stays a Compensation error.
    fn into_refund_rejection(self, item_id: String) -> OpsError {
        match self {
            CompensationOutcome::Voided { .. } => OpsError::RefundRejected {
                errors: vec![format!(
                    "item {item_id} no longer has enough refundable quantity"
                )],
            },
            other => other.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use orchard_core::{BatchStatus, CartStatus};

    #[tokio::test]
    async fn test_create_from_cart_commits_and_decrements() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "APL-GALA", true, false).await;
        let batch = testing::seed_batch(&h, &product, None, 10.0).await;

        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, Some(&batch), 3, 399, 99)],
        )
        .await;

        let tx = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(tx.tx_type, TransactionType::Sale);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.subtotal_cents, 1197);
        assert_eq!(tx.tax_cents, 99);
        assert_eq!(tx.total_cents, 1296);

        // Batch decremented via a recorded movement
        let after = h.db.batches().get_by_id(&batch.id).await.unwrap().unwrap();
        assert!((after.current_quantity - 7.0).abs() < f64::EPSILON);
        let movements = h
            .db
            .batches()
            .list_movements_for_transaction(&tx.id)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert!((movements[0].quantity + 3.0).abs() < f64::EPSILON);

        // Cart flipped, counters bumped
        let session = h.db.carts().get_session(&cart.id).await.unwrap().unwrap();
        assert_eq!(session.status, CartStatus::Completed);
        let shift = h.db.registers().get_by_id(&register.id).await.unwrap().unwrap();
        assert_eq!(shift.total_sales_cents, 1296);
        assert_eq!(shift.total_transactions, 1);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_carts_fail_before_commit() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;

        let empty = testing::stage_cart(&h, "emp-1", Some(&register.id), vec![]).await;
        let err = h
            .engine
            .settlement
            .create_from_cart(&empty.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::EmptyCart { .. }));

        let mut line = testing::open_line(1, 100, 0);
        line.product_id = None;
        line.category_id = None;
        let invalid = testing::stage_cart_raw(&h, "emp-1", Some(&register.id), vec![line]).await;
        let err = h
            .engine
            .settlement
            .create_from_cart(&invalid.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::InvalidCartItem { .. }));
    }

    #[tokio::test]
    async fn test_insufficient_stock_does_not_block_the_sale() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "SALM-FIL", true, true).await;
        let batch = testing::seed_batch(&h, &product, None, 2.0).await;

        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::weighed_line(&product, Some(&batch), 5.0, 2399, 0)],
        )
        .await;

        // Deliberate policy: the sale proceeds, stock goes negative.
        let tx = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);

        let after = h.db.batches().get_by_id(&batch.id).await.unwrap().unwrap();
        assert!((after.current_quantity + 3.0).abs() < f64::EPSILON);
        assert_eq!(after.status, BatchStatus::SoldOut);
    }

    #[tokio::test]
    async fn test_double_submission_is_rejected() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "MILK-1L", false, false).await;
        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, None, 1, 189, 0)],
        )
        .await;

        // First submission still in flight when the second lands.
        let _in_flight = h.engine.guard.try_acquire("cart", &cart.id).unwrap();

        let err = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::AlreadyProcessing { .. }));
    }

    #[tokio::test]
    async fn test_cart_completion_failure_triggers_compensating_void() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "YOG-500", true, false).await;
        let batch = testing::seed_batch(&h, &product, None, 10.0).await;
        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, Some(&batch), 2, 349, 0)],
        )
        .await;

        // Simulate the cart-completion write failing after the transaction
        // committed.
        sqlx::query(
            "CREATE TRIGGER block_cart_complete \
             BEFORE UPDATE OF status ON cart_sessions \
             WHEN NEW.status = 'completed' \
             BEGIN SELECT RAISE(ABORT, 'injected cart failure'); END",
        )
        .execute(h.db.pool())
        .await
        .unwrap();

        let err = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        let transaction_id = match err {
            OpsError::CartCompletionFailed { ref transaction_id } => transaction_id.clone(),
            ref other => panic!("expected CartCompletionFailed, got {other:?}"),
        };
        assert_eq!(err.kind(), crate::error::ErrorKind::Compensation);

        // The sale exists but is voided
        let tx = h
            .db
            .transactions()
            .get_by_id(&transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Voided);
        assert_eq!(
            tx.void_reason.as_deref(),
            Some("cart completion failed (automatic void)")
        );

        // No counters reflect the sale
        let shift = h.db.registers().get_by_id(&register.id).await.unwrap().unwrap();
        assert_eq!(shift.total_sales_cents, 0);
        assert_eq!(shift.total_transactions, 0);

        // Stock restored by the reversal adjustment
        let after = h.db.batches().get_by_id(&batch.id).await.unwrap().unwrap();
        assert!((after.current_quantity - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_failed_compensation_is_surfaced_loudly() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "YOG-500", false, false).await;
        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, None, 1, 349, 0)],
        )
        .await;

        // Both the cart completion and the compensating void fail.
        sqlx::query(
            "CREATE TRIGGER block_cart_complete \
             BEFORE UPDATE OF status ON cart_sessions \
             WHEN NEW.status = 'completed' \
             BEGIN SELECT RAISE(ABORT, 'injected cart failure'); END",
        )
        .execute(h.db.pool())
        .await
        .unwrap();
        sqlx::query(
            "CREATE TRIGGER block_void \
             BEFORE UPDATE OF status ON transactions \
             WHEN NEW.status = 'voided' \
             BEGIN SELECT RAISE(ABORT, 'injected void failure'); END",
        )
        .execute(h.db.pool())
        .await
        .unwrap();

        let err = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::CompensationFailed { .. }));

        let alerts = h.sink.take();
        assert!(alerts.iter().any(|a| matches!(
            a,
            crate::notify::ManagerAlert::CompensationFailure { .. }
        )));
    }

    #[tokio::test]
    async fn test_partial_refunds_never_exceed_original_quantity() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "EGGS-12", false, false).await;
        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, None, 3, 529, 0)],
        )
        .await;
        let sale = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap();
        let item = &h.db.transactions().list_items(&sale.id).await.unwrap()[0];

        let refund_of = |units: f64| {
            vec![RefundItemRequest {
                item_id: item.id.clone(),
                units,
            }]
        };

        // 2 of 3
        let refund = h
            .engine
            .settlement
            .create_refund(&sale.id, &refund_of(2.0), &register.id, None)
            .await
            .unwrap();
        assert_eq!(refund.tx_type, TransactionType::Refund);
        assert_eq!(refund.subtotal_cents, 1058);
        assert_eq!(refund.original_transaction_id.as_deref(), Some(sale.id.as_str()));

        // 2 more would exceed; fails closed
        let err = h
            .engine
            .settlement
            .create_refund(&sale.id, &refund_of(2.0), &register.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::RefundRejected { .. }));

        // The final unit goes through; invariant holds at the boundary
        h.engine
            .settlement
            .create_refund(&sale.id, &refund_of(1.0), &register.id, None)
            .await
            .unwrap();
        let after = h.db.transactions().get_item(&item.id).await.unwrap().unwrap();
        assert!((after.refunded_quantity - 3.0).abs() < f64::EPSILON);
        assert!(after.remaining_refundable().abs() < f64::EPSILON);

        let err = h
            .engine
            .settlement
            .create_refund(&sale.id, &refund_of(1.0), &register.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::RefundRejected { .. }));

        let shift = h.db.registers().get_by_id(&register.id).await.unwrap().unwrap();
        assert_eq!(shift.total_refunds_cents, 529 * 3);
    }

    #[tokio::test]
    async fn test_refund_outside_open_shift_needs_manager() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "BREAD-W", false, false).await;
        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, None, 1, 449, 0)],
        )
        .await;
        let sale = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap();
        let item = &h.db.transactions().list_items(&sale.id).await.unwrap()[0];

        // Shift ends; the employee is cascaded off the clock.
        h.engine
            .cascade
            .end_register_shift(&register.id, 5449, None)
            .await
            .unwrap();

        let request = vec![RefundItemRequest {
            item_id: item.id.clone(),
            units: 1.0,
        }];
        let report = h
            .engine
            .settlement
            .validate_refund_eligibility(&sale.id, &request)
            .await
            .unwrap();
        assert!(report.is_valid);
        assert!(report.requires_manager_approval);

        // Next day: fresh work shift + register shift to process the refund.
        h.clock.advance(chrono::Duration::hours(16));
        let today_register = testing::open_register(&h, "emp-1", 5000).await;

        let err = h
            .engine
            .settlement
            .create_refund(&sale.id, &request, &today_register.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::ManagerApprovalRequired { .. }));

        let refund = h
            .engine
            .settlement
            .create_refund(&sale.id, &request, &today_register.id, Some("mgr-1"))
            .await
            .unwrap();
        assert_eq!(refund.total_cents, 449);
    }

    #[tokio::test]
    async fn test_void_reverses_stock_and_counts() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "CHKN-BRST", true, false).await;
        let batch = testing::seed_batch(&h, &product, None, 8.0).await;
        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, Some(&batch), 2, 1099, 0)],
        )
        .await;
        let sale = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::ExternalCard)
            .await
            .unwrap();

        let report = h
            .engine
            .settlement
            .validate_void_eligibility(&sale.id)
            .await
            .unwrap();
        assert!(report.is_valid);
        assert!(!report.requires_manager_approval);

        let voided = h
            .engine
            .settlement
            .void_transaction(&sale.id, Some("wrong items rung"), None)
            .await
            .unwrap();
        assert_eq!(voided.status, TransactionStatus::Voided);
        assert_eq!(voided.void_reason.as_deref(), Some("wrong items rung"));

        let after = h.db.batches().get_by_id(&batch.id).await.unwrap().unwrap();
        assert!((after.current_quantity - 8.0).abs() < f64::EPSILON);

        let shift = h.db.registers().get_by_id(&register.id).await.unwrap().unwrap();
        assert_eq!(shift.total_voids, 1);

        // Void is not idempotent-silent: second attempt fails.
        let err = h
            .engine
            .settlement
            .void_transaction(&sale.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::AlreadyVoided { .. }));

        // And a refund against a voided sale fails validation.
        let item = &h.db.transactions().list_items(&sale.id).await.unwrap()[0];
        let report = h
            .engine
            .settlement
            .validate_refund_eligibility(
                &sale.id,
                &[RefundItemRequest {
                    item_id: item.id.clone(),
                    units: 1.0,
                }],
            )
            .await
            .unwrap();
        assert!(!report.is_valid);
    }

    #[tokio::test]
    async fn test_void_outside_open_shift_needs_manager() {
        let h = testing::harness().await;
        let register = testing::open_register(&h, "emp-1", 5000).await;
        let product = testing::seed_product(&h, "SPIN-200", false, false).await;
        let cart = testing::stage_cart(
            &h,
            "emp-1",
            Some(&register.id),
            vec![testing::cart_line(&product, None, 1, 279, 0)],
        )
        .await;
        let sale = h
            .engine
            .settlement
            .create_from_cart(&cart.id, PaymentMethod::Cash)
            .await
            .unwrap();

        h.engine
            .cascade
            .end_register_shift(&register.id, 5279, None)
            .await
            .unwrap();

        let report = h
            .engine
            .settlement
            .validate_void_eligibility(&sale.id)
            .await
            .unwrap();
        assert!(report.is_valid);
        assert!(report.requires_manager_approval);

        let err = h
            .engine
            .settlement
            .void_transaction(&sale.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::ManagerApprovalRequired { .. }));

        let voided = h
            .engine
            .settlement
            .void_transaction(&sale.id, None, Some("mgr-1"))
            .await
            .unwrap();
        assert_eq!(voided.status, TransactionStatus::Voided);
    }

    #[tokio::test]
    async fn test_select_batches_for_sale_uses_product_rotation() {
        let h = testing::harness().await;
        let product = testing::seed_product(&h, "BERRY-P", true, false).await;
        let today = h.clock.now().date_naive();
        let soon = testing::seed_batch(&h, &product, Some(today + chrono::Duration::days(2)), 5.0)
            .await;
        testing::seed_batch(&h, &product, Some(today + chrono::Duration::days(9)), 5.0).await;

        // FEFO (the product default) picks the earliest expiry as primary.
        let outcome = h
            .engine
            .settlement
            .select_batches_for_sale(&product.id, 3.0, None, false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AllocationOutcome::Single {
                batch_id: soon.id.clone(),
                take: 3.0
            }
        );

        // More than any single batch holds, splitting disallowed.
        let outcome = h
            .engine
            .settlement
            .select_batches_for_sale(&product.id, 8.0, None, false)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AllocationOutcome::ManualSelectionRequired { .. }
        ));
    }
}
