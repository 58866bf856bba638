//! Draw execution and the periodic draw scanner.
//!
//! A draw picks one winner uniformly among a competition's purchased tickets
//! and finalizes competition and entry state exactly once. Winner selection
//! uses a seed-recorded PRNG: each draw generates a fresh entropy seed, logs
//! it, and returns it in the outcome, so any draw can be re-derived from its
//! seed. This makes draws replayable, not certified-auditable; a regulated
//! deployment should substitute an audited generator behind this seam.

use metrics::counter;
use raffle_core::environment::Clock;
use raffle_core::error::{Result, TicketError};
use raffle_core::store::TicketPoolStore;
use raffle_core::types::{CompetitionId, Entry, EntryStatus, Ticket, TicketStatus, UserId, Win};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// The finalized result of one draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawOutcome {
    /// The drawn ticket
    pub winning_ticket: Ticket,
    /// The entry owning the drawn ticket, now marked won
    pub winning_entry: Entry,
    /// The winning user
    pub winner: UserId,
    /// The created win record, pending fulfillment
    pub win: Win,
    /// The PRNG seed the pick was derived from
    pub seed: u64,
}

/// Executes draws against a store, one competition at a time.
pub struct DrawEngine {
    store: Arc<dyn TicketPoolStore>,
    clock: Arc<dyn Clock>,
}

impl DrawEngine {
    /// Create a draw engine over the given store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn TicketPoolStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Draw a winner for one competition and finalize its state.
    ///
    /// Idempotent at the store: the winner column acts as a compare-and-swap,
    /// so a second invocation (or a concurrent one racing this) fails with
    /// `AlreadyDrawn` and changes nothing.
    ///
    /// # Errors
    ///
    /// `NotYetDue` if the trigger condition does not hold, `NoEligibleTickets`
    /// if nothing was purchased, `AlreadyDrawn` if a winner is recorded.
    pub async fn perform_draw(&self, competition_id: CompetitionId) -> Result<DrawOutcome> {
        let now = self.clock.now();
        let competition = self.store.competition(competition_id).await?;
        if competition.winner_user_id.is_some() {
            return Err(TicketError::AlreadyDrawn { competition_id });
        }
        if !competition.is_due_for_draw(now) {
            return Err(TicketError::NotYetDue { competition_id });
        }

        let purchased = self
            .store
            .tickets(competition_id, Some(TicketStatus::Purchased))
            .await?;
        if purchased.is_empty() {
            return Err(TicketError::NoEligibleTickets { competition_id });
        }

        // Fresh entropy seed per draw; the pick is fully determined by it.
        let seed: u64 = rand::random();
        let mut rng = StdRng::seed_from_u64(seed);
        let index = rng.gen_range(0..purchased.len());
        let winning_ticket = purchased[index].clone();

        let mut winning_entry = self.store.entry_owning_ticket(winning_ticket.id).await?;
        let winner = winning_entry.user_id;
        let win = self
            .store
            .record_draw(competition_id, winning_entry.id, winning_ticket.id, winner, now)
            .await?;
        winning_entry.status = EntryStatus::Won;

        counter!("raffle_draws_total").increment(1);
        info!(
            competition_id = %competition_id,
            winning_ticket = %winning_ticket.number,
            entry_id = %winning_entry.id,
            winner = %winner,
            seed,
            eligible = purchased.len(),
            "Draw completed"
        );
        Ok(DrawOutcome {
            winning_ticket,
            winning_entry,
            winner,
            win,
            seed,
        })
    }

    /// Draw every competition whose trigger condition holds at this instant.
    ///
    /// Each competition is processed independently: a failure on one is
    /// logged and counted, never propagated to the rest.
    ///
    /// # Errors
    ///
    /// Only if the due-competition listing itself fails; per-competition
    /// failures are absorbed into the report.
    pub async fn scan_once(&self) -> Result<ScanReport> {
        let now = self.clock.now();
        let due = self.store.competitions_due_for_draw(now).await?;
        let mut report = ScanReport::default();

        for competition in due {
            match self.perform_draw(competition.id).await {
                Ok(outcome) => {
                    report.drawn += 1;
                    info!(
                        competition_id = %competition.id,
                        winner = %outcome.winner,
                        "Scanner drew competition"
                    );
                }
                // A due competition nobody entered stays open for the
                // operator to cancel; not a scanner failure.
                Err(TicketError::NoEligibleTickets { .. }) => {
                    report.skipped += 1;
                    warn!(
                        competition_id = %competition.id,
                        "Due competition has no purchased tickets; skipping"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    counter!("raffle_draw_failures_total").increment(1);
                    error!(
                        competition_id = %competition.id,
                        error = %err,
                        "Draw failed; continuing with remaining competitions"
                    );
                }
            }
        }
        Ok(report)
    }
}

/// What one scanner pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Competitions drawn this pass
    pub drawn: usize,
    /// Due competitions skipped for having no purchased tickets
    pub skipped: usize,
    /// Competitions whose draw failed
    pub failed: usize,
}

/// Periodic background task enumerating due competitions and drawing them.
pub struct DrawScanner {
    engine: Arc<DrawEngine>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl DrawScanner {
    /// Create a scanner ticking at `interval`.
    #[must_use]
    pub const fn new(
        engine: Arc<DrawEngine>,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            engine,
            interval,
            shutdown,
        }
    }

    /// Spawn the scanner loop; it runs until the shutdown signal.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval = ?self.interval, "Draw scanner started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.engine.scan_once().await {
                            Ok(report) if report.drawn + report.failed > 0 => {
                                info!(
                                    drawn = report.drawn,
                                    skipped = report.skipped,
                                    failed = report.failed,
                                    "Draw scan pass complete"
                                );
                            }
                            Ok(_) => {}
                            Err(err) => {
                                error!(error = %err, "Draw scan pass failed");
                            }
                        }
                    }
                    _ = self.shutdown.recv() => {
                        info!("Draw scanner shutting down");
                        break;
                    }
                }
            }
        })
    }
}
