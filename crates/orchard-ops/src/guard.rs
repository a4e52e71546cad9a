//! # In-Flight Operation Guard
//!
//! Re-entrancy protection for the operation entry points.
//!
//! A double-tapped "complete sale" reaches the backend as two concurrent
//! calls for the same cart. The first call registers the entity key here;
//! the second finds the key taken and is rejected with `AlreadyProcessing`
//! instead of being queued. Keys are released on drop, so early returns and
//! errors release automatically.
//!
//! Keys are `"<entity>:<id>"`: `cart:<id>`, `employee:<id>`,
//! `register:<id>`, `transaction:<id>`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{OpsError, OpsResult};

/// Process-wide set of entity keys with an operation in flight.
#[derive(Debug, Clone, Default)]
pub struct OpGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl OpGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        OpGuard::default()
    }

    /// Registers an operation on the entity, or rejects if one is running.
    ///
    /// The returned token releases the key when dropped.
    pub fn try_acquire(&self, entity: &'static str, id: &str) -> OpsResult<InFlight> {
        let key = format!("{entity}:{id}");
        let mut set = self.in_flight.lock().expect("op guard mutex poisoned");

        if !set.insert(key.clone()) {
            return Err(OpsError::AlreadyProcessing {
                entity,
                id: id.to_string(),
            });
        }

        Ok(InFlight {
            key,
            set: Arc::clone(&self.in_flight),
        })
    }
}

/// RAII token for an in-flight operation. Dropping it releases the key.
#[derive(Debug)]
pub struct InFlight {
    key: String,
    set: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
