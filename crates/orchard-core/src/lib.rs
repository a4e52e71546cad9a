//! # orchard-core: Pure Business Logic for Orchard POS
//!
//! This crate is the **heart** of the Orchard POS shift and settlement
//! engine. It contains all business rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Orchard POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                UI / IPC shell (out of scope here)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        orchard-ops (timeclock, register, cascade, settlement)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ orchard-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ allocation │  │ timesheet │  │   │
//! │  │   │ WorkShift │  │   Money   │  │ FEFO/FIFO  │  │ hours &   │  │   │
//! │  │   │ Batch ... │  │  (cents)  │  │  walking   │  │ overtime  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    orchard-db (SQLite layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (WorkShift, RegisterShift, Batch, Transaction, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`allocation`] - FEFO/FIFO batch allocation
//! - [`timesheet`] - Worked-hours and overtime math
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod money;
pub mod timesheet;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use orchard_core::Money` instead of
// `use orchard_core::money::Money`

pub use allocation::{allocate, AllocationLeg, AllocationOutcome};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default business ID for the single-store runtime.
///
/// The schema carries `business_id` on shifts and transactions so the data
/// model survives a future multi-store backend; the running system is a
/// single store and stamps this constant everywhere.
pub const DEFAULT_BUSINESS_ID: &str = "00000000-0000-0000-0000-000000000001";
