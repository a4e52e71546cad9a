//! # Timeclock Service
//!
//! The work-shift state machine: clock-in/clock-out and breaks.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Work Shift State Machine                            │
//! │                                                                         │
//! │  clock_in ──► WorkShift { Active } ──clock_out──► { Completed }         │
//! │                   │      ▲                            (terminal)        │
//! │       start_break │      │ end_break                                    │
//! │                   ▼      │                                              │
//! │              Break { Active }                                           │
//! │                                                                         │
//! │  Guards:                                                                │
//! │  • clock_in with an active shift        → AlreadyClockedIn              │
//! │  • clock_out without an active shift    → NoActiveShift                 │
//! │  • second concurrent op per employee    → AlreadyProcessing             │
//! │  • re-entrant completion                → rejected by guarded UPDATE    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ordering on clock-out: close dangling break, write the `out` event, then
//! complete the shift. A failure at any step stops the later steps.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use orchard_core::{
    timesheet, validation, Break, BreakStatus, ClockEvent, ClockEventStatus, ClockEventType,
    ClockMethod, WorkShift, WorkShiftStatus, DEFAULT_BUSINESS_ID,
};
use orchard_db::{Database, DbError};

use crate::error::{OpsError, OpsResult};
use crate::guard::OpGuard;
use crate::policy::OpsPolicy;
use crate::time::TimeSource;

/// Work-shift state machine service.
#[derive(Clone)]
pub struct TimeclockService {
    db: Database,
    clock: Arc<dyn TimeSource>,
    guard: OpGuard,
    policy: OpsPolicy,
}

impl TimeclockService {
    /// Creates a new TimeclockService.
    pub fn new(
        db: Database,
        clock: Arc<dyn TimeSource>,
        guard: OpGuard,
        policy: OpsPolicy,
    ) -> Self {
        TimeclockService {
            db,
            clock,
            guard,
            policy,
        }
    }

    /// Clocks an employee in, creating the `in` event and an active shift.
    ///
    /// ## Errors
    /// * `AlreadyClockedIn` - an active shift already exists
    /// * `AlreadyProcessing` - a concurrent clock operation is in flight
    pub async fn clock_in(
        &self,
        employee_id: &str,
        terminal_id: &str,
        method: ClockMethod,
    ) -> OpsResult<WorkShift> {
        validation::validate_reference_id("employee_id", employee_id)?;
        validation::validate_reference_id("terminal_id", terminal_id)?;

        let _token = self.guard.try_acquire("employee", employee_id)?;
        debug!(employee_id = %employee_id, ?method, "clock_in");

        if let Some(existing) = self.db.clock().find_active_shift(employee_id).await? {
            return Err(OpsError::AlreadyClockedIn {
                employee_id: employee_id.to_string(),
                shift_id: existing.id,
            });
        }

        let now = self.clock.now();
        let event = ClockEvent {
            id: Uuid::new_v4().to_string(),
            employee_id: employee_id.to_string(),
            terminal_id: terminal_id.to_string(),
            event_type: ClockEventType::In,
            method,
            timestamp: now,
            status: ClockEventStatus::Confirmed,
            created_at: now,
        };
        let shift = WorkShift {
            id: Uuid::new_v4().to_string(),
            employee_id: employee_id.to_string(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            clock_in_event_id: event.id.clone(),
            clock_out_event_id: None,
            schedule_id: None,
            status: WorkShiftStatus::Active,
            total_hours: None,
            overtime_hours: None,
            created_at: now,
            updated_at: now,
        };

        // The partial unique index re-verifies the check above at write time.
        match self.db.clock().create_shift_with_clock_in(&event, &shift).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                let existing = self.db.clock().find_active_shift(employee_id).await?;
                return Err(OpsError::AlreadyClockedIn {
                    employee_id: employee_id.to_string(),
                    shift_id: existing.map(|s| s.id).unwrap_or_default(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(employee_id = %employee_id, shift_id = %shift.id, ?method, "Clocked in");
        Ok(shift)
    }

    /// Clocks an employee out, completing the active shift.
    ///
    /// Closes a dangling break first, writes the `out` event, computes
    /// worked hours net of unpaid breaks, then completes the shift.
    ///
    /// ## Errors
    /// * `NoActiveShift` - nothing to clock out of (also covers re-entrant
    ///   calls racing a completion)
    pub async fn clock_out(&self, employee_id: &str, method: ClockMethod) -> OpsResult<WorkShift> {
        validation::validate_reference_id("employee_id", employee_id)?;

        let _token = self.guard.try_acquire("employee", employee_id)?;
        debug!(employee_id = %employee_id, ?method, "clock_out");

        let shift = self
            .db
            .clock()
            .find_active_shift(employee_id)
            .await?
            .ok_or_else(|| OpsError::NoActiveShift {
                employee_id: employee_id.to_string(),
            })?;

        let now = self.clock.now();

        // Step 1: close any dangling break.
        if let Some(brk) = self.db.clock().find_active_break(&shift.id).await? {
            debug!(shift_id = %shift.id, break_id = %brk.id, "Auto-closing dangling break");
            self.db.clock().end_break(&brk.id, now).await?;
        }

        // Step 2: write the out event.
        let clock_in_event = self
            .db
            .clock()
            .get_event(&shift.clock_in_event_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "ClockEvent",
                id: shift.clock_in_event_id.clone(),
            })?;

        let out_event = ClockEvent {
            id: Uuid::new_v4().to_string(),
            employee_id: employee_id.to_string(),
            terminal_id: clock_in_event.terminal_id.clone(),
            event_type: ClockEventType::Out,
            method,
            timestamp: now,
            status: ClockEventStatus::Confirmed,
            created_at: now,
        };
        self.db.clock().insert_event(&out_event).await?;

        // Step 3: compute hours and complete the shift.
        let breaks = self.db.clock().list_breaks(&shift.id).await?;
        let total_hours = timesheet::worked_hours(clock_in_event.timestamp, now, &breaks)?;
        let overtime = timesheet::overtime_hours(total_hours, self.policy.standard_hours);

        match self
            .db
            .clock()
            .complete_shift(&shift.id, &out_event.id, total_hours, overtime, now)
            .await
        {
            Ok(()) => {}
            // Guarded transition lost a race with another completion.
            Err(DbError::NotFound { .. }) => {
                return Err(OpsError::NoActiveShift {
                    employee_id: employee_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            employee_id = %employee_id,
            shift_id = %shift.id,
            total_hours = %total_hours,
            overtime_hours = %overtime,
            ?method,
            "Clocked out"
        );

        self.db
            .clock()
            .get_shift(&shift.id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "WorkShift",
                id: shift.id.clone(),
            })
    }

    /// Starts a break on the employee's active shift.
    ///
    /// ## Errors
    /// * `NoActiveShift` - not clocked in
    /// * `BreakAlreadyActive` - at most one active break per shift
    pub async fn start_break(
        &self,
        employee_id: &str,
        break_type: &str,
        is_paid: bool,
    ) -> OpsResult<Break> {
        validation::validate_reference_id("employee_id", employee_id)?;
        validation::validate_reference_id("break_type", break_type)?;

        let _token = self.guard.try_acquire("employee", employee_id)?;

        let shift = self
            .db
            .clock()
            .find_active_shift(employee_id)
            .await?
            .ok_or_else(|| OpsError::NoActiveShift {
                employee_id: employee_id.to_string(),
            })?;

        if let Some(existing) = self.db.clock().find_active_break(&shift.id).await? {
            return Err(OpsError::BreakAlreadyActive {
                shift_id: existing.shift_id,
            });
        }

        let now = self.clock.now();
        let brk = Break {
            id: Uuid::new_v4().to_string(),
            shift_id: shift.id.clone(),
            break_type: break_type.to_string(),
            is_paid,
            start_time: now,
            end_time: None,
            status: BreakStatus::Active,
            created_at: now,
        };

        match self.db.clock().insert_break(&brk).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(OpsError::BreakAlreadyActive { shift_id: shift.id })
            }
            Err(e) => return Err(e.into()),
        }

        info!(employee_id = %employee_id, shift_id = %shift.id, break_type = %break_type, "Break started");
        Ok(brk)
    }

    /// Ends the active break on the employee's active shift.
    ///
    /// ## Errors
    /// * `NoActiveShift` / `NoActiveBreak`
    pub async fn end_break(&self, employee_id: &str) -> OpsResult<Break> {
        validation::validate_reference_id("employee_id", employee_id)?;

        let _token = self.guard.try_acquire("employee", employee_id)?;

        let shift = self
            .db
            .clock()
            .find_active_shift(employee_id)
            .await?
            .ok_or_else(|| OpsError::NoActiveShift {
                employee_id: employee_id.to_string(),
            })?;

        let mut brk = self
            .db
            .clock()
            .find_active_break(&shift.id)
            .await?
            .ok_or_else(|| OpsError::NoActiveBreak {
                shift_id: shift.id.clone(),
            })?;

        let now = self.clock.now();
        match self.db.clock().end_break(&brk.id, now).await {
            Ok(()) => {}
            Err(DbError::NotFound { .. }) => {
                return Err(OpsError::NoActiveBreak { shift_id: shift.id })
            }
            Err(e) => return Err(e.into()),
        }

        brk.end_time = Some(now);
        brk.status = BreakStatus::Completed;

        info!(employee_id = %employee_id, shift_id = %shift.id, break_id = %brk.id, "Break ended");
        Ok(brk)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::Duration;

    #[tokio::test]
    async fn test_clock_in_creates_active_shift() {
        let h = testing::harness().await;

        let shift = h
            .engine
            .timeclock
            .clock_in("emp-1", "pos-01", ClockMethod::Manual)
            .await
            .unwrap();

        assert_eq!(shift.status, WorkShiftStatus::Active);
        assert!(shift.clock_out_event_id.is_none());

        let event = h
            .db
            .clock()
            .get_event(&shift.clock_in_event_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type, ClockEventType::In);
        assert_eq!(event.method, ClockMethod::Manual);
    }

    #[tokio::test]
    async fn test_double_clock_in_is_rejected() {
        let h = testing::harness().await;

        let first = h
            .engine
            .timeclock
            .clock_in("emp-1", "pos-01", ClockMethod::Login)
            .await
            .unwrap();

        let err = h
            .engine
            .timeclock
            .clock_in("emp-1", "pos-01", ClockMethod::Login)
            .await
            .unwrap_err();

        match err {
            OpsError::AlreadyClockedIn { shift_id, .. } => assert_eq!(shift_id, first.id),
            other => panic!("expected AlreadyClockedIn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clock_out_computes_hours_minus_unpaid_breaks() {
        let h = testing::harness().await;
        let tc = &h.engine.timeclock;

        tc.clock_in("emp-1", "pos-01", ClockMethod::Login)
            .await
            .unwrap();

        h.clock.advance(Duration::hours(4));
        tc.start_break("emp-1", "meal", false).await.unwrap();
        h.clock.advance(Duration::minutes(30));
        tc.end_break("emp-1").await.unwrap();
        h.clock.advance(Duration::hours(4) + Duration::minutes(30));

        let shift = tc.clock_out("emp-1", ClockMethod::Manual).await.unwrap();

        assert_eq!(shift.status, WorkShiftStatus::Completed);
        assert!(shift.clock_out_event_id.is_some());
        // 9h span minus 30m unpaid break
        assert!((shift.total_hours.unwrap() - 8.5).abs() < 1e-9);
        assert!((shift.overtime_hours.unwrap() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_clock_out_closes_dangling_break() {
        let h = testing::harness().await;
        let tc = &h.engine.timeclock;

        tc.clock_in("emp-1", "pos-01", ClockMethod::Login)
            .await
            .unwrap();
        h.clock.advance(Duration::hours(4));
        tc.start_break("emp-1", "rest", false).await.unwrap();
        h.clock.advance(Duration::hours(1));

        let shift = tc.clock_out("emp-1", ClockMethod::Auto).await.unwrap();

        // Break ran 4h..5h, closed automatically at clock-out
        assert!((shift.total_hours.unwrap() - 4.0).abs() < 1e-9);

        let breaks = h.db.clock().list_breaks(&shift.id).await.unwrap();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].status, BreakStatus::Completed);
    }

    #[tokio::test]
    async fn test_clock_out_without_shift_is_rejected() {
        let h = testing::harness().await;

        let err = h
            .engine
            .timeclock
            .clock_out("emp-1", ClockMethod::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::NoActiveShift { .. }));

        // Completing twice: the second call finds no active shift.
        h.engine
            .timeclock
            .clock_in("emp-1", "pos-01", ClockMethod::Login)
            .await
            .unwrap();
        h.engine
            .timeclock
            .clock_out("emp-1", ClockMethod::Manual)
            .await
            .unwrap();
        let err = h
            .engine
            .timeclock
            .clock_out("emp-1", ClockMethod::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::NoActiveShift { .. }));
    }

    #[tokio::test]
    async fn test_second_break_is_rejected() {
        let h = testing::harness().await;
        let tc = &h.engine.timeclock;

        tc.clock_in("emp-1", "pos-01", ClockMethod::Login)
            .await
            .unwrap();
        tc.start_break("emp-1", "meal", false).await.unwrap();

        let err = tc.start_break("emp-1", "rest", false).await.unwrap_err();
        assert!(matches!(err, OpsError::BreakAlreadyActive { .. }));

        tc.end_break("emp-1").await.unwrap();
        assert!(tc.start_break("emp-1", "rest", true).await.is_ok());
    }

    /// Invariant: at most one active work shift per employee, under any
    /// interleaving of clock operations.
    #[tokio::test]
    async fn test_random_interleaving_holds_single_active_invariant() {
        let h = testing::harness().await;
        let tc = &h.engine.timeclock;

        // Deterministic xorshift so the failure case is reproducible.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let employees = ["emp-a", "emp-b", "emp-c"];

        for _ in 0..60 {
            let employee = employees[(next() % 3) as usize];
            match next() % 3 {
                0 => {
                    let _ = tc.clock_in(employee, "pos-01", ClockMethod::Manual).await;
                }
                1 => {
                    let _ = tc.clock_out(employee, ClockMethod::Manual).await;
                }
                _ => {
                    let _ = tc.start_break(employee, "rest", false).await;
                }
            }
            h.clock.advance(Duration::minutes(7));

            for employee in &employees {
                let active: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM work_shifts \
                     WHERE employee_id = ?1 AND status = 'active'",
                )
                .bind(employee)
                .fetch_one(h.db.pool())
                .await
                .unwrap();
                assert!(active <= 1, "{employee} has {active} active shifts");
            }
        }
    }
}
