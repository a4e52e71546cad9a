//! # Cascade Orchestrator
//!
//! Keeps WorkShift and RegisterShift(s) consistent without requiring the
//! caller to manage both.
//!
//! ## Cascade Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cascade on Register End                            │
//! │                                                                         │
//! │  RegisterShift ends (manual, sweep, or logout)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Other RegisterShifts still active on the WorkShift? ──yes──► done      │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  close dangling Break → ClockEvent(out, method=auto) → complete shift   │
//! │  (strictly ordered; a failed step stops the later steps)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stale-shift sweep runs before every `start_register_shift` and on the
//! [`crate::sweep::SweepAgent`] timer. Individual shift-close failures are
//! collected and the sweep continues; a work shift whose register shifts did
//! not all close is left active and reported, never half clocked out.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use orchard_core::{validation, ClockMethod, RegisterShift};
use orchard_db::Database;

use crate::error::{OpsError, OpsResult};
use crate::notify::{AlertSink, ManagerAlert};
use crate::policy::OpsPolicy;
use crate::register::{RegisterService, StartShiftRequest};
use crate::time::TimeSource;
use crate::timeclock::TimeclockService;

// =============================================================================
// Outcome Types
// =============================================================================

/// Result of an interactive register-shift end.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndShiftOutcome {
    pub shift: RegisterShift,
    /// Whether ending this shift triggered the automatic clock-out.
    pub clocked_out: bool,
}

/// Result of a logout.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutOutcome {
    /// Register shifts force-ended on the way out.
    pub closed_register_shifts: Vec<String>,
    pub clocked_out: bool,
}

/// What one sweep pass did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Register shifts force-ended with an estimated drawer.
    pub force_closed: Vec<String>,
    /// Register shifts that could not be closed.
    pub failed_closes: Vec<String>,
    /// Employees auto-clocked-out because their last register shift closed.
    pub clocked_out: Vec<String>,
    /// Work shifts left active because a bound register shift failed to
    /// close.
    pub failed_cascades: Vec<String>,
    /// Overtime warnings emitted this pass.
    pub overtime_warnings: usize,
    /// Batches flipped to expired this pass.
    pub expired_batches: u64,
}

impl SweepReport {
    /// True when the pass changed nothing and warned about nothing.
    pub fn is_quiet(&self) -> bool {
        self.force_closed.is_empty()
            && self.failed_closes.is_empty()
            && self.clocked_out.is_empty()
            && self.failed_cascades.is_empty()
            && self.overtime_warnings == 0
            && self.expired_batches == 0
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Couples the work-shift and register-shift state machines.
#[derive(Clone)]
pub struct CascadeOrchestrator {
    db: Database,
    clock: Arc<dyn TimeSource>,
    timeclock: TimeclockService,
    register: RegisterService,
    sink: Arc<dyn AlertSink>,
    policy: OpsPolicy,
}

impl CascadeOrchestrator {
    /// Creates a new CascadeOrchestrator.
    pub fn new(
        db: Database,
        clock: Arc<dyn TimeSource>,
        timeclock: TimeclockService,
        register: RegisterService,
        sink: Arc<dyn AlertSink>,
        policy: OpsPolicy,
    ) -> Self {
        CascadeOrchestrator {
            db,
            clock,
            timeclock,
            register,
            sink,
            policy,
        }
    }

    /// Opens a register shift, sweeping stale shifts first.
    pub async fn start_register_shift(&self, req: StartShiftRequest) -> OpsResult<RegisterShift> {
        // A failed sweep must not block the interactive open; whatever is
        // wrong will also surface on the open itself if it matters.
        if let Err(e) = self.sweep_stale_shifts().await {
            warn!(error = %e, "Stale-shift sweep before start_shift failed");
        }

        self.register.start_shift(req).await
    }

    /// Ends a register shift and runs the clock-out cascade if it was the
    /// last one active on its work shift.
    pub async fn end_register_shift(
        &self,
        shift_id: &str,
        final_cash_drawer_cents: i64,
        expected_cash_drawer_cents: Option<i64>,
    ) -> OpsResult<EndShiftOutcome> {
        let shift = self
            .register
            .end_shift(shift_id, final_cash_drawer_cents, expected_cash_drawer_cents)
            .await?;

        let clocked_out = self.cascade_for_work_shift(&shift.time_shift_id).await?;

        Ok(EndShiftOutcome { shift, clocked_out })
    }

    /// Logout: ends any open register shifts, then auto clocks out, unless
    /// the caller opted out with `auto_clock_out = false`.
    ///
    /// ## Errors
    /// * `CascadeIncomplete` - a register shift could not be closed; the
    ///   work shift is left active and nothing is clocked out
    pub async fn logout(&self, employee_id: &str, auto_clock_out: bool) -> OpsResult<LogoutOutcome> {
        validation::validate_reference_id("employee_id", employee_id)?;

        let Some(work_shift) = self.db.clock().find_active_shift(employee_id).await? else {
            debug!(employee_id = %employee_id, "Logout with no active work shift");
            return Ok(LogoutOutcome::default());
        };

        if !auto_clock_out {
            info!(employee_id = %employee_id, "Logout without auto clock-out");
            return Ok(LogoutOutcome::default());
        }

        let open = self
            .db
            .registers()
            .list_active_by_time_shift(&work_shift.id)
            .await?;

        let mut closed = Vec::new();
        let mut failed = Vec::new();
        for shift in open {
            match self.register.force_end_estimated(&shift).await {
                Ok(ended) => {
                    self.sink.alert(ManagerAlert::ShiftForceClosed {
                        register_shift_id: ended.id.clone(),
                        cashier_id: ended.cashier_id.clone(),
                        estimated_drawer_cents: ended.final_cash_drawer_cents.unwrap_or(0),
                    });
                    closed.push(ended.id);
                }
                // Already ended by a racing sweep; nothing left to do.
                Err(OpsError::ShiftNotActive { .. }) => {}
                Err(e) => {
                    warn!(shift_id = %shift.id, error = %e, "Failed to close register shift at logout");
                    failed.push(shift.id);
                }
            }
        }

        if !failed.is_empty() {
            return Err(OpsError::CascadeIncomplete {
                work_shift_id: work_shift.id,
                failed_shift_ids: failed,
            });
        }

        let clocked_out = match self
            .timeclock
            .clock_out(employee_id, ClockMethod::Auto)
            .await
        {
            Ok(_) => true,
            Err(OpsError::NoActiveShift { .. }) => false,
            Err(e) => return Err(e),
        };

        info!(
            employee_id = %employee_id,
            closed = closed.len(),
            clocked_out,
            "Logout cascade complete"
        );

        Ok(LogoutOutcome {
            closed_register_shifts: closed,
            clocked_out,
        })
    }

    /// One stale-shift sweep pass.
    ///
    /// Force-ends register shifts past their grace window (or older than
    /// the maximum age) with an estimated drawer, emits overtime warnings,
    /// flips expired batches, and runs the clock-out cascade for work
    /// shifts whose register shifts all closed.
    pub async fn sweep_stale_shifts(&self) -> OpsResult<SweepReport> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        match self.db.batches().mark_expired(self.clock.today(), now).await {
            Ok(count) => report.expired_batches = count,
            Err(e) => warn!(error = %e, "Batch expiry sweep failed"),
        }

        let active = self.db.registers().list_active().await?;
        let mut affected_work_shifts = BTreeSet::new();

        for shift in active {
            let past_grace = shift
                .scheduled_end
                .map(|end| end + self.policy.force_close_after < now)
                .unwrap_or(false);
            let over_age = shift.opened_at + self.policy.max_shift_age < now;

            if past_grace || over_age {
                affected_work_shifts.insert(shift.time_shift_id.clone());
                match self.register.force_end_estimated(&shift).await {
                    Ok(ended) => {
                        info!(
                            shift_id = %ended.id,
                            cashier_id = %ended.cashier_id,
                            estimated = %ended.estimated_drawer(),
                            "Force-closed stale register shift"
                        );
                        self.sink.alert(ManagerAlert::ShiftForceClosed {
                            register_shift_id: ended.id.clone(),
                            cashier_id: ended.cashier_id.clone(),
                            estimated_drawer_cents: ended.final_cash_drawer_cents.unwrap_or(0),
                        });
                        report.force_closed.push(ended.id);
                    }
                    // Lost the race to a manual end; the shift is closed
                    // either way.
                    Err(OpsError::ShiftNotActive { .. }) => {}
                    Err(e) => {
                        warn!(shift_id = %shift.id, error = %e, "Failed to force-close stale shift");
                        report.failed_closes.push(shift.id);
                    }
                }
            } else if let Some(end) = shift.scheduled_end {
                if now > end + self.policy.overtime_warning {
                    self.sink.alert(ManagerAlert::OvertimeWarning {
                        register_shift_id: shift.id.clone(),
                        cashier_id: shift.cashier_id.clone(),
                        minutes_over: (now - end).num_minutes(),
                    });
                    report.overtime_warnings += 1;
                }
            }
        }

        // The cascade fires per work shift, and only once every bound
        // register shift is closed. A failed close keeps the work shift
        // active and is reported instead.
        for work_shift_id in affected_work_shifts {
            let remaining = self
                .db
                .registers()
                .list_active_by_time_shift(&work_shift_id)
                .await?;

            if remaining.is_empty() {
                match self.cascade_for_work_shift(&work_shift_id).await {
                    Ok(true) => {
                        let shift = self.db.clock().get_shift(&work_shift_id).await?;
                        if let Some(shift) = shift {
                            report.clocked_out.push(shift.employee_id);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(work_shift_id = %work_shift_id, error = %e, "Sweep cascade failed");
                        report.failed_cascades.push(work_shift_id);
                    }
                }
            } else if remaining
                .iter()
                .any(|s| report.failed_closes.contains(&s.id))
            {
                report.failed_cascades.push(work_shift_id);
            }
        }

        if !report.is_quiet() {
            info!(
                force_closed = report.force_closed.len(),
                failed = report.failed_closes.len(),
                clocked_out = report.clocked_out.len(),
                overtime_warnings = report.overtime_warnings,
                expired_batches = report.expired_batches,
                "Stale-shift sweep finished"
            );
        }

        Ok(report)
    }

    /// Runs the auto clock-out if no register shift remains active on the
    /// work shift. Returns whether a clock-out happened.
    async fn cascade_for_work_shift(&self, work_shift_id: &str) -> OpsResult<bool> {
        let remaining = self
            .db
            .registers()
            .list_active_by_time_shift(work_shift_id)
            .await?;
        if !remaining.is_empty() {
            return Ok(false);
        }

        let Some(work_shift) = self.db.clock().get_shift(work_shift_id).await? else {
            return Err(OpsError::NotFound {
                entity: "WorkShift",
                id: work_shift_id.to_string(),
            });
        };
        if !work_shift.is_active() {
            return Ok(false);
        }

        match self
            .timeclock
            .clock_out(&work_shift.employee_id, ClockMethod::Auto)
            .await
        {
            Ok(_) => {
                info!(
                    work_shift_id = %work_shift_id,
                    employee_id = %work_shift.employee_id,
                    "Cascade auto clock-out"
                );
                Ok(true)
            }
            // Raced a manual clock-out; consistent either way.
            Err(OpsError::NoActiveShift { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
