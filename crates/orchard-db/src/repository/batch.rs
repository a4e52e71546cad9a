//! # Batch Repository
//!
//! Database operations for inventory batches and stock movements.
//!
//! Quantities only change through recorded movements: receiving inserts the
//! batch plus a `receipt` movement in one transaction, and the settlement
//! path records a `sale` movement alongside each decrement. Batch selection
//! itself never writes.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use orchard_core::{Batch, StockMovement};

const BATCH_COLUMNS: &str = "id, product_id, batch_number, expiry_date, received_at, \
     initial_quantity, current_quantity, status, created_at, updated_at";

const MOVEMENT_COLUMNS: &str =
    "id, product_id, batch_id, movement_type, quantity, transaction_id, note, created_at";

/// Repository for batch and stock-movement database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Receives a batch into stock: inserts the batch and its `receipt`
    /// movement in one transaction.
    pub async fn receive_batch(&self, batch: &Batch, movement: &StockMovement) -> DbResult<()> {
        debug!(id = %batch.id, product_id = %batch.product_id, "Receiving batch");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, product_id, batch_number, expiry_date, received_at,
                initial_quantity, current_quantity, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.product_id)
        .bind(&batch.batch_number)
        .bind(batch.expiry_date)
        .bind(batch.received_at)
        .bind(batch.initial_quantity)
        .bind(batch.current_quantity)
        .bind(batch.status)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_movement_tx(&mut tx, movement).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Gets a batch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Lists the product's `active` batches (allocation engine input).
    pub async fn list_active_for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE product_id = ?1 AND status = 'active' ORDER BY received_at"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Applies a sale decrement to a batch and records the movement, in one
    /// transaction. Flips the batch to `sold_out` when quantity reaches zero
    /// or below (negative stock is allowed by policy, but an emptied batch
    /// stops being a selection candidate).
    pub async fn apply_sale_decrement(
        &self,
        batch_id: &str,
        units: f64,
        movement: &StockMovement,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(batch_id = %batch_id, units = %units, "Applying sale decrement");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE batches SET
                current_quantity = current_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(batch_id)
        .bind(units)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", batch_id));
        }

        sqlx::query(
            r#"
            UPDATE batches SET status = 'sold_out', updated_at = ?2
            WHERE id = ?1 AND status = 'active' AND current_quantity <= 0
            "#,
        )
        .bind(batch_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_movement_tx(&mut tx, movement).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Restores quantity to a batch (void reversal) and records the
    /// `adjustment` movement. Reactivates a `sold_out` batch that climbs
    /// back above zero.
    pub async fn apply_adjustment(
        &self,
        batch_id: &str,
        units: f64,
        movement: &StockMovement,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(batch_id = %batch_id, units = %units, "Applying adjustment");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE batches SET
                current_quantity = current_quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(batch_id)
        .bind(units)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", batch_id));
        }

        sqlx::query(
            r#"
            UPDATE batches SET status = 'active', updated_at = ?2
            WHERE id = ?1 AND status = 'sold_out' AND current_quantity > 0
            "#,
        )
        .bind(batch_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_movement_tx(&mut tx, movement).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Flips `active` batches whose expiry date has passed to `expired`.
    ///
    /// Run by the background sweep. Returns the number of batches flipped.
    pub async fn mark_expired(&self, today: NaiveDate, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE batches SET status = 'expired', updated_at = ?2
            WHERE status = 'active'
              AND expiry_date IS NOT NULL
              AND expiry_date < ?1
            "#,
        )
        .bind(today)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Records a stock movement with no quantity change attached
    /// (e.g. a sale against an untracked batch reference).
    pub async fn insert_movement(&self, movement: &StockMovement) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_movement_tx(&mut tx, movement).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Lists the movements recorded against a transaction, oldest first.
    pub async fn list_movements_for_transaction(
        &self,
        transaction_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE transaction_id = ?1 ORDER BY created_at"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

/// Inserts a movement inside an open transaction.
async fn insert_movement_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, batch_id, movement_type, quantity,
            transaction_id, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(&movement.batch_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(&movement.transaction_id)
    .bind(&movement.note)
    .bind(movement.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
