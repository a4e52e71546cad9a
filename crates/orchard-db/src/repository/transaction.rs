//! # Transaction Repository
//!
//! Database operations for transactions and their line items.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transaction Lifecycle                               │
//! │                                                                         │
//! │  1. COMMIT (from cart)                                                  │
//! │     └── insert_with_items() → Transaction + TransactionItems            │
//! │         (one SQLite transaction: the §durable-write of settlement)      │
//! │                                                                         │
//! │  2a. REFUND (partial or full)                                           │
//! │     └── insert_with_items() for the refund record                       │
//! │     └── add_refunded_quantity() on the original items                   │
//! │         (guarded: fails closed if remaining quantity is consumed)       │
//! │                                                                         │
//! │  2b. VOID (manual or compensating)                                      │
//! │     └── mark_voided() (guarded: only a completed transaction)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use orchard_core::{Transaction, TransactionItem};

const TX_COLUMNS: &str = "id, shift_id, business_id, tx_type, status, subtotal_cents, \
     tax_cents, total_cents, payment_method, original_transaction_id, \
     void_reason, created_at, updated_at, voided_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, category_id, name_snapshot, \
     quantity, weight, unit_price_cents, line_total_cents, batch_id, \
     refunded_quantity, created_at";

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Inserts a transaction and all of its items in one durable write.
    ///
    /// Either the whole financial record lands or none of it does.
    pub async fn insert_with_items(
        &self,
        transaction: &Transaction,
        items: &[TransactionItem],
    ) -> DbResult<()> {
        debug!(
            id = %transaction.id,
            tx_type = ?transaction.tx_type,
            items = items.len(),
            "Inserting transaction"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, shift_id, business_id, tx_type, status, subtotal_cents,
                tax_cents, total_cents, payment_method, original_transaction_id,
                void_reason, created_at, updated_at, voided_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.shift_id)
        .bind(&transaction.business_id)
        .bind(transaction.tx_type)
        .bind(transaction.status)
        .bind(transaction.subtotal_cents)
        .bind(transaction.tax_cents)
        .bind(transaction.total_cents)
        .bind(transaction.payment_method)
        .bind(&transaction.original_transaction_id)
        .bind(&transaction.void_reason)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .bind(transaction.voided_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, product_id, category_id, name_snapshot,
                    quantity, weight, unit_price_cents, line_total_cents,
                    batch_id, refunded_quantity, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&item.id)
            .bind(&item.transaction_id)
            .bind(&item.product_id)
            .bind(&item.category_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.weight)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .bind(&item.batch_id)
            .bind(item.refunded_quantity)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Gets all items for a transaction, oldest first.
    pub async fn list_items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items \
             WHERE transaction_id = ?1 ORDER BY created_at"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a single transaction item by ID.
    pub async fn get_item(&self, id: &str) -> DbResult<Option<TransactionItem>> {
        let item = sqlx::query_as::<_, TransactionItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Accumulates refunded units on the original items, all or nothing.
    ///
    /// Guarded: each update only matches while its item still has that many
    /// un-refunded units, so a racing refund that consumed the remainder
    /// rolls the whole batch back and fails closed instead of
    /// over-refunding.
    pub async fn add_refunded_quantities(&self, updates: &[(String, f64)]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for (item_id, units) in updates {
            let result = sqlx::query(
                r#"
                UPDATE transaction_items SET
                    refunded_quantity = refunded_quantity + ?2
                WHERE id = ?1
                  AND (COALESCE(weight, CAST(quantity AS REAL)) - refunded_quantity) >= ?2
                "#,
            )
            .bind(item_id)
            .bind(units)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("TransactionItem (refundable)", item_id));
            }
        }

        tx.commit().await?;

        Ok(())
    }

    /// Voids a transaction, recording the reason.
    ///
    /// Guarded: only a `completed` transaction can be voided; voiding twice
    /// fails instead of silently succeeding.
    pub async fn mark_voided(
        &self,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, reason = %reason, "Voiding transaction");

        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                status = 'voided',
                void_reason = ?2,
                voided_at = ?3,
                updated_at = ?3
            WHERE id = ?1 AND status = 'completed'
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction (completed)", id));
        }

        Ok(())
    }

    /// Lists transactions recorded on a register shift, oldest first.
    pub async fn list_by_shift(&self, shift_id: &str) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE shift_id = ?1 ORDER BY created_at"
        ))
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
