//! # Sweep Agent
//!
//! Background task driving the periodic stale-shift sweep (and the batch
//! expiry sweep that rides along with it).
//!
//! The interactive `start_register_shift` path runs the same sweep inline;
//! this agent covers the overnight case where nobody opens a shift for
//! hours. Sweep and interactive calls may race: the force-close uses the
//! same guarded state transition as a manual end, so only one of them wins
//! per shift.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cascade::CascadeOrchestrator;

/// Default interval between sweep passes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Periodic sweep task.
pub struct SweepAgent {
    cascade: Arc<CascadeOrchestrator>,
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running [`SweepAgent`].
pub struct SweepAgentHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweepAgentHandle {
    /// Signals the agent to stop after its current pass.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl SweepAgent {
    /// Spawns the sweep loop onto the runtime and returns its handle.
    pub fn spawn(cascade: Arc<CascadeOrchestrator>, interval: Duration) -> SweepAgentHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let agent = SweepAgent {
            cascade,
            interval,
            shutdown_rx,
        };
        tokio::spawn(agent.run());

        SweepAgentHandle { shutdown_tx }
    }

    /// Main loop: sweep on every tick until shutdown.
    async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Sweep agent started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of tokio's interval fires immediately, which gives
        // us a catch-up pass right after startup.
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.cascade.sweep_stale_shifts().await {
                        Ok(report) if report.is_quiet() => {
                            debug!("Sweep pass: nothing to do");
                        }
                        Ok(report) => {
                            info!(
                                force_closed = report.force_closed.len(),
                                clocked_out = report.clocked_out.len(),
                                expired_batches = report.expired_batches,
                                "Sweep pass finished"
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "Sweep pass failed");
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Sweep agent received shutdown");
                    break;
                }
            }
        }

        info!("Sweep agent stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::Duration as ChronoDuration;
    use orchard_core::RegisterShiftStatus;

    #[tokio::test]
    async fn test_agent_sweeps_on_startup_tick() {
        let h = testing::harness().await;
        let stale = testing::open_register(&h, "emp-1", 5000).await;
        h.clock.advance(ChronoDuration::hours(25));

        let handle = SweepAgent::spawn(
            Arc::new(h.engine.cascade.clone()),
            Duration::from_secs(3600),
        );

        // The immediate first tick performs the catch-up pass.
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await;

        let swept = h.db.registers().get_by_id(&stale.id).await.unwrap().unwrap();
        assert_eq!(swept.status, RegisterShiftStatus::Ended);
        assert!(swept.auto_closed);
    }
}
