//! # Repository Module
//!
//! Database repository implementations for Orchard POS.
//!
//! Each repository is a thin struct over the shared `SqlitePool` with one
//! responsibility. State transitions are guarded in SQL
//! (`WHERE id = ? AND status = ?` plus a `rows_affected` check), so every
//! check-then-act sequence in the orchestration layer is re-verified at the
//! moment of the write.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Minimal catalog reads
//! - [`batch::BatchRepository`] - Batches and stock movements
//! - [`clock::ClockRepository`] - Clock events, work shifts, breaks
//! - [`register::RegisterRepository`] - Register shifts and counters
//! - [`transaction::TransactionRepository`] - Transactions and items
//! - [`cart::CartRepository`] - Cart sessions and staged items

pub mod batch;
pub mod cart;
pub mod clock;
pub mod product;
pub mod register;
pub mod transaction;
