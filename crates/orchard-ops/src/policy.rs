//! # Operational Policy
//!
//! Business-policy knobs loaded at startup. These are store policy timers
//! and thresholds, not I/O timeouts.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`ORCHARD_*`)
//! 2. Defaults (this file)

use chrono::Duration;

/// Policy configuration for the shift and settlement engine.
#[derive(Debug, Clone)]
pub struct OpsPolicy {
    /// Maximum starting cash a drawer may open with.
    /// Default: $5,000.00
    pub starting_cash_ceiling_cents: i64,

    /// Absolute cash variance above which an ended shift is flagged for
    /// manager reconciliation.
    /// Default: $5.00
    pub variance_tolerance_cents: i64,

    /// How far past its scheduled end a register shift runs before a
    /// manager overtime warning is emitted.
    /// Default: 15 minutes
    pub overtime_warning: Duration,

    /// How far past its scheduled end a register shift runs before the
    /// sweep force-ends it.
    /// Default: 2 hours
    pub force_close_after: Duration,

    /// Age at which an unscheduled register shift is force-ended
    /// regardless of schedule.
    /// Default: 24 hours
    pub max_shift_age: Duration,

    /// Standard working day used for overtime computation.
    /// Default: 8.0 hours
    pub standard_hours: f64,
}

impl Default for OpsPolicy {
    fn default() -> Self {
        OpsPolicy {
            starting_cash_ceiling_cents: 500_000,
            variance_tolerance_cents: 500,
            overtime_warning: Duration::minutes(15),
            force_close_after: Duration::hours(2),
            max_shift_age: Duration::hours(24),
            standard_hours: 8.0,
        }
    }
}

impl OpsPolicy {
    /// Creates a policy from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `ORCHARD_CASH_CEILING_CENTS`: Override the starting cash ceiling
    /// - `ORCHARD_VARIANCE_TOLERANCE_CENTS`: Override the variance tolerance
    /// - `ORCHARD_STANDARD_HOURS`: Override the standard working day
    pub fn from_env() -> Self {
        let mut policy = OpsPolicy::default();

        if let Ok(v) = std::env::var("ORCHARD_CASH_CEILING_CENTS") {
            if let Ok(cents) = v.parse::<i64>() {
                policy.starting_cash_ceiling_cents = cents;
            }
        }

        if let Ok(v) = std::env::var("ORCHARD_VARIANCE_TOLERANCE_CENTS") {
            if let Ok(cents) = v.parse::<i64>() {
                policy.variance_tolerance_cents = cents;
            }
        }

        if let Ok(v) = std::env::var("ORCHARD_STANDARD_HOURS") {
            if let Ok(hours) = v.parse::<f64>() {
                policy.standard_hours = hours;
            }
        }

        policy
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = OpsPolicy::default();
        assert_eq!(policy.starting_cash_ceiling_cents, 500_000);
        assert_eq!(policy.variance_tolerance_cents, 500);
        assert_eq!(policy.overtime_warning, Duration::minutes(15));
        assert_eq!(policy.force_close_after, Duration::hours(2));
        assert_eq!(policy.max_shift_age, Duration::hours(24));
    }
}
