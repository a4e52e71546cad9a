//! # orchard-ops: Shift & Settlement Orchestration for Orchard POS
//!
//! The operation layer of the engine: everything the UI/IPC shell calls.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Orchard POS Engine                                 │
//! │                                                                         │
//! │  UI / IPC shell                                                         │
//! │       │  clock_in, start_register_shift, create_from_cart, ...          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  orchard-ops (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌──────────────┐   │   │
//! │  │   │ Timeclock │ │ Register  │ │  Cascade  │ │  Settlement  │   │   │
//! │  │   │  Service  │ │  Service  │ │Orchestratr│ │   Service    │   │   │
//! │  │   └───────────┘ └───────────┘ └───────────┘ └──────────────┘   │   │
//! │  │         shared: OpGuard · TimeSource · AlertSink · Policy      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  orchard-db (SQLite) + orchard-core (pure logic)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`timeclock`] - Work-shift state machine (clock-in/out, breaks)
//! - [`register`] - Register-shift state machine (open/end/reconcile)
//! - [`cascade`] - Cascade orchestrator + stale-shift sweep
//! - [`settlement`] - Cart commit, refunds, voids, batch selection
//! - [`sweep`] - Background sweep agent
//! - [`guard`] - Re-entrancy guard
//! - [`time`] / [`notify`] - Injected clock and alert sink
//! - [`policy`] / [`error`] - Policy knobs and the operation error type
//!
//! ## Usage
//!
//! ```rust,ignore
//! use orchard_db::{Database, DbConfig};
//! use orchard_ops::Engine;
//!
//! let db = Database::new(DbConfig::new("./orchard.db")).await?;
//! let engine = Engine::with_defaults(db);
//!
//! engine.timeclock.clock_in("emp-7", "pos-01", ClockMethod::Login).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cascade;
pub mod error;
pub mod guard;
pub mod notify;
pub mod policy;
pub mod register;
pub mod settlement;
pub mod sweep;
pub mod time;
pub mod timeclock;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use cascade::{CascadeOrchestrator, EndShiftOutcome, LogoutOutcome, SweepReport};
pub use error::{ErrorKind, OpsError, OpsResult};
pub use guard::OpGuard;
pub use notify::{AlertSink, LogSink, ManagerAlert, MemorySink};
pub use policy::OpsPolicy;
pub use register::{RegisterService, StartShiftRequest};
pub use settlement::{EligibilityReport, RefundItemRequest, SettlementService};
pub use sweep::{SweepAgent, SweepAgentHandle, DEFAULT_SWEEP_INTERVAL};
pub use time::{ManualClock, SystemClock, TimeSource};
pub use timeclock::TimeclockService;

use std::sync::Arc;

use orchard_db::Database;

// =============================================================================
// Engine
// =============================================================================

/// The wired-up engine: all services sharing one guard, clock, sink, and
/// policy. Construct once at startup and hand to the shell.
#[derive(Clone)]
pub struct Engine {
    pub timeclock: TimeclockService,
    pub register: RegisterService,
    pub cascade: CascadeOrchestrator,
    pub settlement: SettlementService,
    /// Shared in-flight guard (exposed so a shell can pre-check).
    pub guard: OpGuard,
}

impl Engine {
    /// Wires the services together with explicit collaborators.
    pub fn new(
        db: Database,
        policy: OpsPolicy,
        clock: Arc<dyn TimeSource>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let guard = OpGuard::new();

        let timeclock = TimeclockService::new(
            db.clone(),
            clock.clone(),
            guard.clone(),
            policy.clone(),
        );
        let register = RegisterService::new(
            db.clone(),
            clock.clone(),
            guard.clone(),
            sink.clone(),
            policy.clone(),
        );
        let cascade = CascadeOrchestrator::new(
            db.clone(),
            clock.clone(),
            timeclock.clone(),
            register.clone(),
            sink.clone(),
            policy.clone(),
        );
        let settlement = SettlementService::new(db, clock, guard.clone(), sink);

        Engine {
            timeclock,
            register,
            cascade,
            settlement,
            guard,
        }
    }

    /// Wires the engine with the system clock, log-based alerts, and
    /// environment-derived policy.
    pub fn with_defaults(db: Database) -> Self {
        Engine::new(
            db,
            OpsPolicy::from_env(),
            Arc::new(SystemClock),
            Arc::new(LogSink),
        )
    }
}
