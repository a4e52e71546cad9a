//! # Timesheet Math
//!
//! Worked-hours and overtime computation for completed work shifts.
//!
//! Hours are fractional (7.5 = 7h30m). Unpaid breaks reduce worked time;
//! paid breaks do not.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Break, BreakStatus};

/// Computes worked hours for a shift: clock span minus unpaid break time.
///
/// ## Arguments
/// * `clock_in` - Timestamp of the `in` clock event
/// * `clock_out` - Timestamp of the `out` clock event
/// * `breaks` - All breaks taken during the shift; every break must be
///   completed (the orchestrator closes dangling breaks before clock-out)
///
/// ## Errors
/// * [`CoreError::InvalidClockSequence`] if `clock_out` precedes `clock_in`,
///   a break is still active, or a break falls outside the shift window
pub fn worked_hours(
    clock_in: DateTime<Utc>,
    clock_out: DateTime<Utc>,
    breaks: &[Break],
) -> CoreResult<f64> {
    if clock_out < clock_in {
        return Err(CoreError::InvalidClockSequence {
            reason: "clock-out precedes clock-in".to_string(),
        });
    }

    let mut unpaid_break_hours = 0.0;
    for brk in breaks {
        if brk.status == BreakStatus::Active || brk.end_time.is_none() {
            return Err(CoreError::InvalidClockSequence {
                reason: format!("break {} is still active", brk.id),
            });
        }
        let end = brk.end_time.unwrap_or(brk.start_time);
        if brk.start_time < clock_in || end > clock_out {
            return Err(CoreError::InvalidClockSequence {
                reason: format!("break {} falls outside the shift window", brk.id),
            });
        }
        if !brk.is_paid {
            unpaid_break_hours += (end - brk.start_time).num_seconds() as f64 / 3600.0;
        }
    }

    let span_hours = (clock_out - clock_in).num_seconds() as f64 / 3600.0;
    Ok((span_hours - unpaid_break_hours).max(0.0))
}

/// Computes overtime: hours beyond the standard working day, floored at zero.
#[inline]
pub fn overtime_hours(total_hours: f64, standard_hours: f64) -> f64 {
    (total_hours - standard_hours).max(0.0)
}

// =============================================================================
// Unit Tests
// =============================================================================
