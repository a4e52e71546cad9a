//! # Clock Repository
//!
//! Database operations for clock events, work shifts, and breaks.
//!
//! ## Work Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Work Shift Lifecycle                               │
//! │                                                                         │
//! │  1. CLOCK IN                                                            │
//! │     └── create_shift_with_clock_in() → ClockEvent(in) + WorkShift       │
//! │         (single SQLite transaction)                                     │
//! │                                                                         │
//! │  2. BREAKS (optional, at most one active)                               │
//! │     └── insert_break() / end_break()                                    │
//! │                                                                         │
//! │  3. CLOCK OUT                                                           │
//! │     └── insert_event(out) then complete_shift()                         │
//! │         (guarded: WHERE status = 'active')                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The partial unique indexes (`one active shift per employee`, `one active
//! break per shift`) back up the application-level guards.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use orchard_core::{Break, ClockEvent, WorkShift};

const SHIFT_COLUMNS: &str = "id, employee_id, business_id, clock_in_event_id, \
     clock_out_event_id, schedule_id, status, total_hours, overtime_hours, \
     created_at, updated_at";

const BREAK_COLUMNS: &str =
    "id, shift_id, break_type, is_paid, start_time, end_time, status, created_at";

/// Repository for clock events, work shifts, and breaks.
#[derive(Debug, Clone)]
pub struct ClockRepository {
    pool: SqlitePool,
}

impl ClockRepository {
    /// Creates a new ClockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClockRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Clock events
    // -------------------------------------------------------------------------

    /// Inserts a clock event. Events are append-only.
    pub async fn insert_event(&self, event: &ClockEvent) -> DbResult<()> {
        debug!(id = %event.id, employee_id = %event.employee_id, "Inserting clock event");

        sqlx::query(
            r#"
            INSERT INTO clock_events (
                id, employee_id, terminal_id, event_type, method,
                timestamp, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&event.id)
        .bind(&event.employee_id)
        .bind(&event.terminal_id)
        .bind(event.event_type)
        .bind(event.method)
        .bind(event.timestamp)
        .bind(event.status)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a clock event by ID.
    pub async fn get_event(&self, id: &str) -> DbResult<Option<ClockEvent>> {
        let event = sqlx::query_as::<_, ClockEvent>(
            r#"
            SELECT id, employee_id, terminal_id, event_type, method,
                   timestamp, status, created_at
            FROM clock_events
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    // -------------------------------------------------------------------------
    // Work shifts
    // -------------------------------------------------------------------------

    /// Creates the clock-in event and its work shift in one transaction.
    ///
    /// Either both rows land or neither does; a shift can never exist
    /// without its clock-in event.
    pub async fn create_shift_with_clock_in(
        &self,
        event: &ClockEvent,
        shift: &WorkShift,
    ) -> DbResult<()> {
        debug!(shift_id = %shift.id, employee_id = %shift.employee_id, "Creating work shift");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO clock_events (
                id, employee_id, terminal_id, event_type, method,
                timestamp, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&event.id)
        .bind(&event.employee_id)
        .bind(&event.terminal_id)
        .bind(event.event_type)
        .bind(event.method)
        .bind(event.timestamp)
        .bind(event.status)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO work_shifts (
                id, employee_id, business_id, clock_in_event_id,
                clock_out_event_id, schedule_id, status, total_hours,
                overtime_hours, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.employee_id)
        .bind(&shift.business_id)
        .bind(&shift.clock_in_event_id)
        .bind(&shift.clock_out_event_id)
        .bind(&shift.schedule_id)
        .bind(shift.status)
        .bind(shift.total_hours)
        .bind(shift.overtime_hours)
        .bind(shift.created_at)
        .bind(shift.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Gets a work shift by ID.
    pub async fn get_shift(&self, id: &str) -> DbResult<Option<WorkShift>> {
        let shift = sqlx::query_as::<_, WorkShift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM work_shifts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Finds the employee's active work shift, if any.
    pub async fn find_active_shift(&self, employee_id: &str) -> DbResult<Option<WorkShift>> {
        let shift = sqlx::query_as::<_, WorkShift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM work_shifts \
             WHERE employee_id = ?1 AND status = 'active'"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Completes a work shift: attaches the clock-out event and computed
    /// hours, and flips the status.
    ///
    /// Guarded: only an `active` shift can complete. A second completion
    /// attempt finds no matching row and fails instead of silently
    /// succeeding.
    pub async fn complete_shift(
        &self,
        id: &str,
        clock_out_event_id: &str,
        total_hours: f64,
        overtime_hours: f64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE work_shifts SET
                status = 'completed',
                clock_out_event_id = ?2,
                total_hours = ?3,
                overtime_hours = ?4,
                updated_at = ?5
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(clock_out_event_id)
        .bind(total_hours)
        .bind(overtime_hours)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("WorkShift (active)", id));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Breaks
    // -------------------------------------------------------------------------

    /// Inserts a break.
    pub async fn insert_break(&self, brk: &Break) -> DbResult<()> {
        debug!(id = %brk.id, shift_id = %brk.shift_id, "Inserting break");

        sqlx::query(
            r#"
            INSERT INTO breaks (
                id, shift_id, break_type, is_paid, start_time,
                end_time, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&brk.id)
        .bind(&brk.shift_id)
        .bind(&brk.break_type)
        .bind(brk.is_paid)
        .bind(brk.start_time)
        .bind(brk.end_time)
        .bind(brk.status)
        .bind(brk.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finds the shift's active break, if any.
    pub async fn find_active_break(&self, shift_id: &str) -> DbResult<Option<Break>> {
        let brk = sqlx::query_as::<_, Break>(&format!(
            "SELECT {BREAK_COLUMNS} FROM breaks \
             WHERE shift_id = ?1 AND status = 'active'"
        ))
        .bind(shift_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(brk)
    }

    /// Lists all breaks for a shift, oldest first.
    pub async fn list_breaks(&self, shift_id: &str) -> DbResult<Vec<Break>> {
        let breaks = sqlx::query_as::<_, Break>(&format!(
            "SELECT {BREAK_COLUMNS} FROM breaks \
             WHERE shift_id = ?1 ORDER BY start_time"
        ))
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(breaks)
    }

    /// Ends a break. Guarded: only an `active` break can end.
    pub async fn end_break(&self, id: &str, end_time: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE breaks SET
                status = 'completed',
                end_time = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(end_time)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Break (active)", id));
        }

        Ok(())
    }
}
