//! # Batch Allocation Engine
//!
//! Expiry-aware batch selection for perishable stock.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Batch Allocation                                   │
//! │                                                                         │
//! │  Sellable batches for product                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sort by rotation policy (FEFO: expiry asc / FIFO: receipt asc)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  First batch covers request? ──yes──► Single (primary batch)            │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  allow_partial? ──no──► ManualSelectionRequired                         │
//! │       │ yes                                                             │
//! │       ▼                                                                 │
//! │  Walk sorted list accumulating quantity ──► Split (+ shortfall)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Selection is read-only: quantities are decremented only when a
//! StockMovement is recorded at transaction commit. That keeps retried
//! commits from double-decrementing and keeps this module pure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Batch, RotationMethod};

// =============================================================================
// Outcome Types
// =============================================================================

/// One batch's contribution to a split allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocationLeg {
    pub batch_id: String,
    /// Units drawn from this batch.
    pub take: f64,
}

/// Result of a batch allocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// A single batch covers the whole request (the common case: one line
    /// item, one lot).
    Single { batch_id: String, take: f64 },

    /// The request was spread across batches in rotation order.
    /// `shortfall > 0.0` when stock ran out before the request was met.
    Split {
        legs: Vec<AllocationLeg>,
        shortfall: f64,
    },

    /// Satisfying the request would split lots, and the caller asked for a
    /// single lot (`allow_partial = false`). The operator must pick batches
    /// by hand rather than have the engine silently mix lots on one line.
    ManualSelectionRequired { requested: f64, available: f64 },
}

// =============================================================================
// Allocation
// =============================================================================

/// Selects batches to cover `requested` units of a product.
///
/// ## Arguments
/// * `product_id` - Product being allocated (for error context)
/// * `batches` - Candidate batches, any order; non-sellable ones are skipped
/// * `requested` - Units (or weight) to cover; must be positive
/// * `rotation` - FEFO, FIFO, or None (receipt order)
/// * `allow_partial` - Permit drawing one line from multiple lots
/// * `today` - Business date used for expiry filtering
///
/// ## Errors
/// * [`CoreError::NoStockAvailable`] when no sellable batch exists
pub fn allocate(
    product_id: &str,
    batches: &[Batch],
    requested: f64,
    rotation: RotationMethod,
    allow_partial: bool,
    today: NaiveDate,
) -> CoreResult<AllocationOutcome> {
    crate::validation::validate_requested_units(requested)?;

    let mut candidates: Vec<&Batch> = batches.iter().filter(|b| b.is_sellable(today)).collect();

    if candidates.is_empty() {
        return Err(CoreError::NoStockAvailable {
            product_id: product_id.to_string(),
        });
    }

    sort_by_rotation(&mut candidates, rotation);

    // Common case: the first batch in rotation order covers the line.
    let primary = candidates[0];
    if primary.current_quantity >= requested {
        return Ok(AllocationOutcome::Single {
            batch_id: primary.id.clone(),
            take: requested,
        });
    }

    let available: f64 = candidates.iter().map(|b| b.current_quantity).sum();

    if !allow_partial {
        return Ok(AllocationOutcome::ManualSelectionRequired {
            requested,
            available,
        });
    }

    let mut legs = Vec::new();
    let mut remaining = requested;
    for batch in candidates {
        if remaining <= 0.0 {
            break;
        }
        let take = batch.current_quantity.min(remaining);
        legs.push(AllocationLeg {
            batch_id: batch.id.clone(),
            take,
        });
        remaining -= take;
    }

    Ok(AllocationOutcome::Split {
        legs,
        shortfall: remaining.max(0.0),
    })
}

/// Orders candidates by the rotation policy.
///
/// FEFO puts the earliest expiry first (undated batches last); FIFO and
/// None use receipt order. Receipt time breaks FEFO ties so the result is
/// deterministic.
fn sort_by_rotation(candidates: &mut [&Batch], rotation: RotationMethod) {
    match rotation {
        RotationMethod::Fefo => {
            candidates.sort_by(|a, b| {
                match (a.expiry_date, b.expiry_date) {
                    (Some(ea), Some(eb)) => ea.cmp(&eb).then(a.received_at.cmp(&b.received_at)),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => a.received_at.cmp(&b.received_at),
                }
            });
        }
        RotationMethod::Fifo | RotationMethod::None => {
            candidates.sort_by(|a, b| a.received_at.cmp(&b.received_at));
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BatchStatus;
    use chrono::{Duration, Utc};

    fn batch(id: &str, expiry: Option<(i32, u32, u32)>, qty: f64, received_days_ago: i64) -> Batch {
        Batch {
            id: id.to_string(),
            product_id: "p1".to_string(),
            batch_number: format!("LOT-{id}"),
            expiry_date: expiry.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            received_at: Utc::now() - Duration::days(received_days_ago),
            initial_quantity: qty,
            current_quantity: qty,
            status: BatchStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()
    }

    #[test]
    fn test_fefo_picks_earliest_expiry_as_primary() {
        let batches = vec![
            batch("feb", Some((2024, 2, 1)), 5.0, 1),
            batch("jan", Some((2024, 1, 1)), 5.0, 2),
        ];

        let outcome =
            allocate("p1", &batches, 3.0, RotationMethod::Fefo, false, today()).unwrap();

        assert_eq!(
            outcome,
            AllocationOutcome::Single {
                batch_id: "jan".to_string(),
                take: 3.0
            }
        );
    }

    #[test]
    fn test_split_needed_without_partial_requires_manual_selection() {
        let batches = vec![
            batch("jan", Some((2024, 1, 1)), 5.0, 2),
            batch("feb", Some((2024, 2, 1)), 5.0, 1),
        ];

        let outcome =
            allocate("p1", &batches, 8.0, RotationMethod::Fefo, false, today()).unwrap();

        assert_eq!(
            outcome,
            AllocationOutcome::ManualSelectionRequired {
                requested: 8.0,
                available: 10.0
            }
        );
    }

    #[test]
    fn test_split_with_partial_walks_rotation_order() {
        let batches = vec![
            batch("feb", Some((2024, 2, 1)), 5.0, 1),
            batch("jan", Some((2024, 1, 1)), 5.0, 2),
        ];

        let outcome = allocate("p1", &batches, 8.0, RotationMethod::Fefo, true, today()).unwrap();

        match outcome {
            AllocationOutcome::Split { legs, shortfall } => {
                assert_eq!(legs.len(), 2);
                assert_eq!(legs[0].batch_id, "jan");
                assert!((legs[0].take - 5.0).abs() < f64::EPSILON);
                assert_eq!(legs[1].batch_id, "feb");
                assert!((legs[1].take - 3.0).abs() < f64::EPSILON);
                assert!(shortfall.abs() < f64::EPSILON);
            }
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn test_split_reports_shortfall_when_stock_exhausted() {
        let batches = vec![batch("only", Some((2024, 1, 1)), 5.0, 1)];

        let outcome =
            allocate("p1", &batches, 12.0, RotationMethod::Fefo, true, today()).unwrap();

        match outcome {
            AllocationOutcome::Split { legs, shortfall } => {
                assert_eq!(legs.len(), 1);
                assert!((shortfall - 7.0).abs() < f64::EPSILON);
            }
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn test_fifo_ignores_expiry_order() {
        // Older receipt expires later; FIFO still picks it first.
        let batches = vec![
            batch("newer", Some((2024, 1, 1)), 5.0, 1),
            batch("older", Some((2024, 6, 1)), 5.0, 10),
        ];

        let outcome =
            allocate("p1", &batches, 2.0, RotationMethod::Fifo, false, today()).unwrap();

        assert_eq!(
            outcome,
            AllocationOutcome::Single {
                batch_id: "older".to_string(),
                take: 2.0
            }
        );
    }

    #[test]
    fn test_fefo_puts_undated_batches_last() {
        let batches = vec![
            batch("undated", None, 5.0, 10),
            batch("dated", Some((2024, 3, 1)), 5.0, 1),
        ];

        let outcome =
            allocate("p1", &batches, 1.0, RotationMethod::Fefo, false, today()).unwrap();

        assert_eq!(
            outcome,
            AllocationOutcome::Single {
                batch_id: "dated".to_string(),
                take: 1.0
            }
        );
    }

    #[test]
    fn test_no_sellable_batches_is_an_error() {
        let mut expired = batch("old", Some((2022, 1, 1)), 5.0, 400);
        expired.status = BatchStatus::Expired;

        let err = allocate("p1", &[expired], 1.0, RotationMethod::Fefo, false, today())
            .unwrap_err();
        assert!(matches!(err, CoreError::NoStockAvailable { .. }));

        let err = allocate("p1", &[], 1.0, RotationMethod::Fefo, false, today()).unwrap_err();
        assert!(matches!(err, CoreError::NoStockAvailable { .. }));
    }

    #[test]
    fn test_active_but_past_expiry_is_skipped() {
        // Expiry passed but the background sweep hasn't flipped it yet.
        let stale = batch("stale", Some((2023, 11, 1)), 5.0, 40);
        let fresh = batch("fresh", Some((2024, 1, 1)), 5.0, 1);

        let outcome = allocate(
            "p1",
            &[stale, fresh],
            2.0,
            RotationMethod::Fefo,
            false,
            today(),
        )
        .unwrap();

        assert_eq!(
            outcome,
            AllocationOutcome::Single {
                batch_id: "fresh".to_string(),
                take: 2.0
            }
        );
    }

    #[test]
    fn test_rejects_nonpositive_request() {
        let batches = vec![batch("b", Some((2024, 1, 1)), 5.0, 1)];
        assert!(allocate("p1", &batches, 0.0, RotationMethod::Fefo, false, today()).is_err());
    }
}
