//! # Register Shift Repository
//!
//! Database operations for register (cash-handling) shifts.
//!
//! ## Register Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Register Shift Lifecycle                             │
//! │                                                                         │
//! │  1. OPEN                                                                │
//! │     └── insert_shift() → RegisterShift { status: Active }               │
//! │                                                                         │
//! │  2. TRADE                                                               │
//! │     └── add_sale_totals() / add_refund_totals() / add_void_count()      │
//! │         (running counters, guarded on status = 'active')                │
//! │                                                                         │
//! │  3. END (manual or force-closed by the sweep)                           │
//! │     └── end_shift() → variance frozen, status = Ended                   │
//! │         (guarded: ending an ended shift fails, never silently)          │
//! │                                                                         │
//! │  4. (OPTIONAL) RECONCILE                                                │
//! │     └── reconcile() → manager sign-off, review flag cleared             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use orchard_core::RegisterShift;

const COLUMNS: &str = "id, time_shift_id, cashier_id, business_id, device_id, \
     schedule_id, status, starting_cash_cents, final_cash_drawer_cents, \
     expected_cash_drawer_cents, cash_variance_cents, total_sales_cents, \
     total_transactions, total_refunds_cents, total_voids, auto_closed, \
     needs_reconciliation, reconciled_amount_cents, reconciled_by, \
     reconciled_at, scheduled_end, opened_at, ended_at, created_at, updated_at";

/// Repository for register shift database operations.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Inserts a newly opened register shift.
    pub async fn insert_shift(&self, shift: &RegisterShift) -> DbResult<()> {
        debug!(id = %shift.id, cashier_id = %shift.cashier_id, "Inserting register shift");

        sqlx::query(
            r#"
            INSERT INTO register_shifts (
                id, time_shift_id, cashier_id, business_id, device_id,
                schedule_id, status, starting_cash_cents, final_cash_drawer_cents,
                expected_cash_drawer_cents, cash_variance_cents, total_sales_cents,
                total_transactions, total_refunds_cents, total_voids, auto_closed,
                needs_reconciliation, reconciled_amount_cents, reconciled_by,
                reconciled_at, scheduled_end, opened_at, ended_at, created_at,
                updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
            )
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.time_shift_id)
        .bind(&shift.cashier_id)
        .bind(&shift.business_id)
        .bind(&shift.device_id)
        .bind(&shift.schedule_id)
        .bind(shift.status)
        .bind(shift.starting_cash_cents)
        .bind(shift.final_cash_drawer_cents)
        .bind(shift.expected_cash_drawer_cents)
        .bind(shift.cash_variance_cents)
        .bind(shift.total_sales_cents)
        .bind(shift.total_transactions)
        .bind(shift.total_refunds_cents)
        .bind(shift.total_voids)
        .bind(shift.auto_closed)
        .bind(shift.needs_reconciliation)
        .bind(shift.reconciled_amount_cents)
        .bind(&shift.reconciled_by)
        .bind(shift.reconciled_at)
        .bind(shift.scheduled_end)
        .bind(shift.opened_at)
        .bind(shift.ended_at)
        .bind(shift.created_at)
        .bind(shift.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a register shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RegisterShift>> {
        let shift = sqlx::query_as::<_, RegisterShift>(&format!(
            "SELECT {COLUMNS} FROM register_shifts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Lists every active register shift (the stale-shift sweep input).
    pub async fn list_active(&self) -> DbResult<Vec<RegisterShift>> {
        let shifts = sqlx::query_as::<_, RegisterShift>(&format!(
            "SELECT {COLUMNS} FROM register_shifts \
             WHERE status = 'active' ORDER BY opened_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Lists the cashier's active register shifts (any device).
    pub async fn list_active_by_cashier(&self, cashier_id: &str) -> DbResult<Vec<RegisterShift>> {
        let shifts = sqlx::query_as::<_, RegisterShift>(&format!(
            "SELECT {COLUMNS} FROM register_shifts \
             WHERE cashier_id = ?1 AND status = 'active' ORDER BY opened_at"
        ))
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Lists the active register shifts bound to a work shift.
    pub async fn list_active_by_time_shift(
        &self,
        time_shift_id: &str,
    ) -> DbResult<Vec<RegisterShift>> {
        let shifts = sqlx::query_as::<_, RegisterShift>(&format!(
            "SELECT {COLUMNS} FROM register_shifts \
             WHERE time_shift_id = ?1 AND status = 'active' ORDER BY opened_at"
        ))
        .bind(time_shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Ends a register shift, freezing drawer amounts and variance.
    ///
    /// Guarded: only an `active` shift can end. The second of two racing
    /// closers (manual end vs. sweep force-close) finds no row and fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn end_shift(
        &self,
        id: &str,
        final_cash_drawer_cents: i64,
        expected_cash_drawer_cents: i64,
        cash_variance_cents: i64,
        auto_closed: bool,
        needs_reconciliation: bool,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE register_shifts SET
                status = 'ended',
                final_cash_drawer_cents = ?2,
                expected_cash_drawer_cents = ?3,
                cash_variance_cents = ?4,
                auto_closed = ?5,
                needs_reconciliation = ?6,
                ended_at = ?7,
                updated_at = ?7
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(final_cash_drawer_cents)
        .bind(expected_cash_drawer_cents)
        .bind(cash_variance_cents)
        .bind(auto_closed)
        .bind(needs_reconciliation)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RegisterShift (active)", id));
        }

        Ok(())
    }

    /// Adds a completed sale to the shift's running counters.
    pub async fn add_sale_totals(
        &self,
        id: &str,
        total_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE register_shifts SET
                total_sales_cents = total_sales_cents + ?2,
                total_transactions = total_transactions + 1,
                updated_at = ?3
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(total_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RegisterShift (active)", id));
        }

        Ok(())
    }

    /// Adds a refund to the shift's running counters.
    pub async fn add_refund_totals(
        &self,
        id: &str,
        total_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE register_shifts SET
                total_refunds_cents = total_refunds_cents + ?2,
                total_transactions = total_transactions + 1,
                updated_at = ?3
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(total_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RegisterShift (active)", id));
        }

        Ok(())
    }

    /// Counts a void against the shift.
    pub async fn add_void_count(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE register_shifts SET
                total_voids = total_voids + 1,
                updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RegisterShift (active)", id));
        }

        Ok(())
    }

    /// Records a manager reconciliation and clears the review flag.
    ///
    /// Guarded: only an `ended` shift that is flagged for review can be
    /// reconciled.
    pub async fn reconcile(
        &self,
        id: &str,
        approved_amount_cents: i64,
        manager_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, manager_id = %manager_id, "Reconciling register shift");

        let result = sqlx::query(
            r#"
            UPDATE register_shifts SET
                needs_reconciliation = 0,
                reconciled_amount_cents = ?2,
                reconciled_by = ?3,
                reconciled_at = ?4,
                updated_at = ?4
            WHERE id = ?1 AND status = 'ended' AND needs_reconciliation = 1
            "#,
        )
        .bind(id)
        .bind(approved_amount_cents)
        .bind(manager_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RegisterShift (pending review)", id));
        }

        Ok(())
    }
}
