//! # Manager Alerts
//!
//! Notification sink for manager-facing alerts: overtime warnings, forced
//! shift closes, reconciliation flags, compensation failures.
//!
//! The sink is an injected collaborator; delivery (toast, dashboard badge,
//! push) is the shell's concern. The default [`LogSink`] writes structured
//! warnings so alerts are never lost even without a UI attached.

use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

/// A manager-facing alert emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManagerAlert {
    /// A register shift has run past its scheduled end.
    OvertimeWarning {
        register_shift_id: String,
        cashier_id: String,
        minutes_over: i64,
    },

    /// A register shift was force-ended with an estimated drawer.
    ShiftForceClosed {
        register_shift_id: String,
        cashier_id: String,
        estimated_drawer_cents: i64,
    },

    /// A shift ended with a variance above tolerance and awaits sign-off.
    ReconciliationRequired {
        register_shift_id: String,
        cash_variance_cents: i64,
    },

    /// A compensating void failed; the books need manual correction.
    CompensationFailure {
        transaction_id: String,
        reason: String,
    },
}

/// Destination for manager alerts.
pub trait AlertSink: Send + Sync {
    /// Delivers one alert. Must not block and must not fail the caller.
    fn alert(&self, alert: ManagerAlert);
}

/// Default sink: structured warning logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn alert(&self, alert: ManagerAlert) {
        warn!(alert = ?alert, "Manager alert");
    }
}

/// Collecting sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<ManagerAlert>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Drains and returns everything delivered so far.
    pub fn take(&self) -> Vec<ManagerAlert> {
        std::mem::take(&mut *self.alerts.lock().expect("alert sink mutex poisoned"))
    }

    /// Number of alerts delivered so far.
    pub fn len(&self) -> usize {
        self.alerts.lock().expect("alert sink mutex poisoned").len()
    }

    /// Whether no alerts have been delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for MemorySink {
    fn alert(&self, alert: ManagerAlert) {
        self.alerts
            .lock()
            .expect("alert sink mutex poisoned")
            .push(alert);
    }
}
