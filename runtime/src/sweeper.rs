//! Reservation expiry sweeper.
//!
//! Periodic background reclaimer of stale holds: every pass selects the
//! reserved tickets whose deadline has passed and applies the guarded
//! `reserved → available` release to each. The guard is what makes a racing
//! purchase safe: a ticket that just became purchased no longer matches the
//! release precondition, so a late-running sweep fails cleanly on it instead
//! of reverting a sale.

use metrics::counter;
use raffle_core::environment::Clock;
use raffle_core::error::{Result, TicketError};
use raffle_core::store::TicketPoolStore;
use raffle_core::transitions::{ReleaseAuthority, TicketTransition};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What one sweep pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Holds reclaimed back to available
    pub swept: usize,
    /// Expired tickets that changed state under us (usually purchased or
    /// re-released) and were left alone
    pub skipped: usize,
}

/// Periodic reclaimer of lapsed reservations.
pub struct ReservationSweeper {
    store: Arc<dyn TicketPoolStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl ReservationSweeper {
    /// Create a sweeper ticking at `interval`.
    #[must_use]
    pub const fn new(
        store: Arc<dyn TicketPoolStore>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            store,
            clock,
            interval,
            shutdown,
        }
    }

    /// Run one sweep pass over every competition's pool.
    ///
    /// Tolerates partial failure per ticket: a precondition mismatch on one
    /// reclaim never aborts the batch.
    ///
    /// # Errors
    ///
    /// Only if listing expired reservations fails; per-ticket outcomes are
    /// absorbed into the report.
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let expired = self.store.expired_reservations(now).await?;
        let mut report = SweepReport::default();

        let transition = TicketTransition::Release {
            authority: ReleaseAuthority::Sweeper,
        };
        for ticket in expired {
            match self.store.apply_transition(ticket.id, &transition).await {
                Ok(_) => {
                    report.swept += 1;
                    debug!(
                        competition_id = %ticket.competition_id,
                        number = %ticket.number,
                        "Expired reservation reclaimed"
                    );
                }
                // The ticket moved on between the listing and our update:
                // a purchase or an explicit release won the race.
                Err(TicketError::InvalidTransition { .. }) => {
                    report.skipped += 1;
                }
                Err(err) => {
                    report.skipped += 1;
                    counter!("raffle_sweep_failures_total").increment(1);
                    warn!(
                        competition_id = %ticket.competition_id,
                        number = %ticket.number,
                        error = %err,
                        "Failed to reclaim expired reservation; continuing"
                    );
                }
            }
        }

        counter!("raffle_sweeps_total").increment(1);
        counter!("raffle_tickets_swept_total").increment(report.swept as u64);
        if report.swept > 0 {
            info!(
                swept = report.swept,
                skipped = report.skipped,
                "Sweep pass complete"
            );
        }
        Ok(report)
    }

    /// Spawn the sweep loop; it runs until the shutdown signal.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval = ?self.interval, "Reservation sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep_once().await {
                            error!(error = %err, "Sweep pass failed");
                        }
                    }
                    _ = self.shutdown.recv() => {
                        info!("Reservation sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }
}
