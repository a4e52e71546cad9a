//! # Register Service
//!
//! The register-shift state machine: open, end, reconcile.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Register Shift State Machine                           │
//! │                                                                         │
//! │  start_shift ──► RegisterShift { Active } ──end_shift──► { Ended }      │
//! │                                                             (terminal)  │
//! │  Guards at open:                                                        │
//! │  • no active WorkShift              → NotClockedIn                      │
//! │  • active shift on this device      → ShiftAlreadyOpen                  │
//! │  • active shift on another device   → ShiftActiveElsewhere              │
//! │  • starting cash out of 0..=ceiling → Validation                        │
//! │                                                                         │
//! │  Guards at end:                                                         │
//! │  • already ended                    → ShiftNotActive (never silent)     │
//! │                                                                         │
//! │  reconcile: only on an Ended shift flagged needs_reconciliation         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `cash_variance = final_cash_drawer − expected_cash_drawer`. When the
//! caller does not supply an expected drawer, it defaults to
//! `starting_cash + total_sales − total_refunds`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use orchard_core::{validation, RegisterShift, RegisterShiftStatus, DEFAULT_BUSINESS_ID};
use orchard_db::{Database, DbError};

use crate::error::{OpsError, OpsResult};
use crate::guard::OpGuard;
use crate::notify::{AlertSink, ManagerAlert};
use crate::policy::OpsPolicy;
use crate::time::TimeSource;

/// Request to open a register shift.
#[derive(Debug, Clone)]
pub struct StartShiftRequest {
    pub cashier_id: String,
    pub starting_cash_cents: i64,
    pub device_id: Option<String>,
    pub schedule_id: Option<String>,
    /// Scheduled end used by the stale-shift sweep.
    pub scheduled_end: Option<DateTime<Utc>>,
}

impl StartShiftRequest {
    /// Convenience constructor for the common case.
    pub fn new(cashier_id: impl Into<String>, starting_cash_cents: i64) -> Self {
        StartShiftRequest {
            cashier_id: cashier_id.into(),
            starting_cash_cents,
            device_id: None,
            schedule_id: None,
            scheduled_end: None,
        }
    }

    /// Sets the device this shift runs on.
    pub fn on_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets the schedule binding and its end time.
    pub fn scheduled(mut self, schedule_id: impl Into<String>, end: DateTime<Utc>) -> Self {
        self.schedule_id = Some(schedule_id.into());
        self.scheduled_end = Some(end);
        self
    }
}

/// Register-shift state machine service.
#[derive(Clone)]
pub struct RegisterService {
    db: Database,
    clock: Arc<dyn TimeSource>,
    guard: OpGuard,
    sink: Arc<dyn AlertSink>,
    policy: OpsPolicy,
}

impl RegisterService {
    /// Creates a new RegisterService.
    pub fn new(
        db: Database,
        clock: Arc<dyn TimeSource>,
        guard: OpGuard,
        sink: Arc<dyn AlertSink>,
        policy: OpsPolicy,
    ) -> Self {
        RegisterService {
            db,
            clock,
            guard,
            sink,
            policy,
        }
    }

    /// Opens a register shift for a clocked-in cashier.
    pub async fn start_shift(&self, req: StartShiftRequest) -> OpsResult<RegisterShift> {
        validation::validate_reference_id("cashier_id", &req.cashier_id)?;
        if let Some(device) = &req.device_id {
            validation::validate_reference_id("device_id", device)?;
        }
        validation::validate_starting_cash(
            req.starting_cash_cents,
            self.policy.starting_cash_ceiling_cents,
        )?;

        let _token = self.guard.try_acquire("register-open", &req.cashier_id)?;
        debug!(cashier_id = %req.cashier_id, "start_shift");

        // Re-verified here, immediately before the insert: the cashier must
        // hold an active work shift that the new register shift binds to.
        let work_shift = self
            .db
            .clock()
            .find_active_shift(&req.cashier_id)
            .await?
            .ok_or_else(|| OpsError::NotClockedIn {
                cashier_id: req.cashier_id.clone(),
            })?;

        // Same-device duplicates and active-elsewhere are distinct failures
        // so the shell can show the right message.
        for existing in self
            .db
            .registers()
            .list_active_by_cashier(&req.cashier_id)
            .await?
        {
            if existing.device_id == req.device_id {
                return Err(OpsError::ShiftAlreadyOpen {
                    cashier_id: req.cashier_id.clone(),
                    shift_id: existing.id,
                });
            }
            return Err(OpsError::ShiftActiveElsewhere {
                cashier_id: req.cashier_id.clone(),
                device: existing
                    .device_id
                    .unwrap_or_else(|| "unknown device".to_string()),
            });
        }

        let now = self.clock.now();
        let shift = RegisterShift {
            id: Uuid::new_v4().to_string(),
            time_shift_id: work_shift.id.clone(),
            cashier_id: req.cashier_id.clone(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            device_id: req.device_id,
            schedule_id: req.schedule_id,
            status: RegisterShiftStatus::Active,
            starting_cash_cents: req.starting_cash_cents,
            final_cash_drawer_cents: None,
            expected_cash_drawer_cents: None,
            cash_variance_cents: None,
            total_sales_cents: 0,
            total_transactions: 0,
            total_refunds_cents: 0,
            total_voids: 0,
            auto_closed: false,
            needs_reconciliation: false,
            reconciled_amount_cents: None,
            reconciled_by: None,
            reconciled_at: None,
            scheduled_end: req.scheduled_end,
            opened_at: now,
            ended_at: None,
            created_at: now,
            updated_at: now,
        };

        self.db.registers().insert_shift(&shift).await?;

        info!(
            cashier_id = %shift.cashier_id,
            shift_id = %shift.id,
            starting_cash = %shift.starting_cash(),
            "Register shift opened"
        );
        Ok(shift)
    }

    /// Ends a register shift with a counted drawer.
    ///
    /// `expected_cash_drawer_cents` defaults to
    /// `starting_cash + total_sales − total_refunds` when not supplied.
    pub async fn end_shift(
        &self,
        shift_id: &str,
        final_cash_drawer_cents: i64,
        expected_cash_drawer_cents: Option<i64>,
    ) -> OpsResult<RegisterShift> {
        self.end_internal(
            shift_id,
            final_cash_drawer_cents,
            expected_cash_drawer_cents,
            false,
        )
        .await
    }

    /// Force-ends a shift with the estimated drawer
    /// (`starting_cash + total_sales`). Used by the sweep and logout
    /// cascades; always flags the shift for reconciliation.
    pub(crate) async fn force_end_estimated(
        &self,
        shift: &RegisterShift,
    ) -> OpsResult<RegisterShift> {
        let estimate = shift.estimated_drawer().cents();
        self.end_internal(&shift.id, estimate, Some(estimate), true)
            .await
    }

    async fn end_internal(
        &self,
        shift_id: &str,
        final_cash_drawer_cents: i64,
        expected_cash_drawer_cents: Option<i64>,
        forced: bool,
    ) -> OpsResult<RegisterShift> {
        validation::validate_drawer_amount("final_cash_drawer", final_cash_drawer_cents)?;

        let _token = self.guard.try_acquire("register", shift_id)?;
        debug!(shift_id = %shift_id, forced, "end_shift");

        let shift = self
            .db
            .registers()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "RegisterShift",
                id: shift_id.to_string(),
            })?;

        if !shift.is_active() {
            return Err(OpsError::ShiftNotActive {
                shift_id: shift_id.to_string(),
            });
        }

        let expected = expected_cash_drawer_cents.unwrap_or(
            shift.starting_cash_cents + shift.total_sales_cents - shift.total_refunds_cents,
        );
        let variance = final_cash_drawer_cents - expected;
        let needs_reconciliation = forced || variance.abs() > self.policy.variance_tolerance_cents;

        let now = self.clock.now();
        match self
            .db
            .registers()
            .end_shift(
                shift_id,
                final_cash_drawer_cents,
                expected,
                variance,
                forced,
                needs_reconciliation,
                now,
            )
            .await
        {
            Ok(()) => {}
            // The sweep and a manual end race through the same guarded
            // transition; the loser lands here.
            Err(DbError::NotFound { .. }) => {
                return Err(OpsError::ShiftNotActive {
                    shift_id: shift_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        if needs_reconciliation && !forced {
            self.sink.alert(ManagerAlert::ReconciliationRequired {
                register_shift_id: shift_id.to_string(),
                cash_variance_cents: variance,
            });
        }

        info!(
            shift_id = %shift_id,
            variance = %orchard_core::Money::from_cents(variance),
            forced,
            needs_reconciliation,
            "Register shift ended"
        );

        self.db
            .registers()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "RegisterShift",
                id: shift_id.to_string(),
            })
    }

    /// Records a manager's reconciliation of an ended, flagged shift.
    pub async fn reconcile_shift(
        &self,
        shift_id: &str,
        approved_amount_cents: i64,
        manager_id: &str,
    ) -> OpsResult<RegisterShift> {
        validation::validate_reference_id("manager_id", manager_id)?;
        validation::validate_drawer_amount("approved_amount", approved_amount_cents)?;

        let _token = self.guard.try_acquire("register", shift_id)?;

        let shift = self
            .db
            .registers()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "RegisterShift",
                id: shift_id.to_string(),
            })?;

        if shift.is_active() || !shift.needs_reconciliation {
            return Err(OpsError::ReconciliationNotRequired {
                shift_id: shift_id.to_string(),
            });
        }

        let now = self.clock.now();
        match self
            .db
            .registers()
            .reconcile(shift_id, approved_amount_cents, manager_id, now)
            .await
        {
            Ok(()) => {}
            Err(DbError::NotFound { .. }) => {
                return Err(OpsError::ReconciliationNotRequired {
                    shift_id: shift_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        info!(shift_id = %shift_id, manager_id = %manager_id, "Register shift reconciled");

        self.db
            .registers()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| OpsError::NotFound {
                entity: "RegisterShift",
                id: shift_id.to_string(),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
