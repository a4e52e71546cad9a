//! # Cart Repository
//!
//! Database operations for cart sessions and their staged items.
//!
//! The cart is the only mutable aggregate before a transaction commits.
//! Completion and cancellation are guarded transitions: settlement marking
//! a cart `completed` proves it was still `active` at commit time.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use orchard_core::{CartItem, CartSession};

const SESSION_COLUMNS: &str = "id, cashier_id, shift_id, status, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, cart_session_id, product_id, category_id, name_snapshot, \
     quantity, weight, unit_price_cents, line_total_cents, tax_cents, \
     batch_id, created_at";

/// Repository for cart session database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Inserts a new cart session.
    pub async fn insert_session(&self, session: &CartSession) -> DbResult<()> {
        debug!(id = %session.id, cashier_id = %session.cashier_id, "Inserting cart session");

        sqlx::query(
            r#"
            INSERT INTO cart_sessions (
                id, cashier_id, shift_id, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&session.id)
        .bind(&session.cashier_id)
        .bind(&session.shift_id)
        .bind(session.status)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a cart session by ID.
    pub async fn get_session(&self, id: &str) -> DbResult<Option<CartSession>> {
        let session = sqlx::query_as::<_, CartSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM cart_sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Adds an item to a cart session.
    pub async fn insert_item(&self, item: &CartItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (
                id, cart_session_id, product_id, category_id, name_snapshot,
                quantity, weight, unit_price_cents, line_total_cents,
                tax_cents, batch_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.cart_session_id)
        .bind(&item.product_id)
        .bind(&item.category_id)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.weight)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .bind(item.tax_cents)
        .bind(&item.batch_id)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists the items staged in a cart session, oldest first.
    pub async fn list_items(&self, cart_session_id: &str) -> DbResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items \
             WHERE cart_session_id = ?1 ORDER BY created_at"
        ))
        .bind(cart_session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Marks a cart session completed.
    ///
    /// Guarded: only an `active` cart can complete. This is the write whose
    /// failure triggers the compensating void in settlement.
    pub async fn complete_session(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cart_sessions SET status = 'completed', updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CartSession (active)", id));
        }

        Ok(())
    }

    /// Cancels a cart session. Guarded the same way as completion.
    pub async fn cancel_session(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cart_sessions SET status = 'cancelled', updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CartSession (active)", id));
        }

        Ok(())
    }
}
