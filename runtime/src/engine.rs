//! The ticket engine: the operation surface consumed by checkout and admin
//! collaborators.
//!
//! Every mutating operation follows the same shape: validate the request
//! before any lock is taken, acquire the advisory reservation lock over the
//! affected ticket numbers, then drive the store's guarded transitions. The
//! lock reduces wasted retries under contention; the conditional updates in
//! the store are what make the operations correct.

use crate::config::EngineConfig;
use crate::lock::ReservationLockManager;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use raffle_core::environment::Clock;
use raffle_core::error::{Result, TicketError};
use raffle_core::store::{TicketPoolStore, TicketPoolStoreExt};
use raffle_core::transitions::{ReleaseAuthority, TicketTransition};
use raffle_core::types::{
    Competition, CompetitionId, Entry, HolderId, NewCompetition, Ticket, TicketId, TicketNumber,
    TicketStatus, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A confirmed hold over a set of ticket numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// The competition holding the tickets
    pub competition_id: CompetitionId,
    /// The numbers now reserved, ascending
    pub ticket_numbers: Vec<TicketNumber>,
    /// When the hold lapses and the sweeper may reclaim it
    pub expires_at: DateTime<Utc>,
}

/// The result of a confirmed purchase: the purchased tickets and the entry
/// created atomically with them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// The tickets, now purchased
    pub tickets: Vec<Ticket>,
    /// The owning entry
    pub entry: Entry,
}

/// Ticket allocation operations over one store, one clock, and one
/// process-local lock table.
pub struct TicketEngine {
    store: Arc<dyn TicketPoolStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<ReservationLockManager>,
    config: EngineConfig,
}

impl TicketEngine {
    /// Create an engine over the given store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn TicketPoolStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            locks: Arc::new(ReservationLockManager::new(config.lock)),
            config,
        }
    }

    /// The store this engine allocates from.
    #[must_use]
    pub fn store(&self) -> Arc<dyn TicketPoolStore> {
        Arc::clone(&self.store)
    }

    /// The clock this engine reads.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ────────────────────────────────────────────────────────────
    // Admin surface
    // ────────────────────────────────────────────────────────────

    /// Create a competition and bulk-create its ticket pool (draft).
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn create_competition(&self, new: NewCompetition) -> Result<Competition> {
        let competition = self.store.create_competition(new).await?;
        info!(
            competition_id = %competition.id,
            max_tickets = competition.max_tickets,
            "Competition created"
        );
        Ok(competition)
    }

    /// Open a draft competition for entry.
    ///
    /// # Errors
    ///
    /// Returns `CompetitionClosed` if the competition is not in draft.
    pub async fn open_competition(&self, id: CompetitionId) -> Result<Competition> {
        let competition = self.store.open_competition(id).await?;
        info!(competition_id = %id, "Competition opened for entry");
        Ok(competition)
    }

    /// Withdraw a competition before its draw. Outstanding reservations
    /// simply lapse; refund handling for sold tickets is the payment
    /// collaborator's problem, not allocation state.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyDrawn` if a winner is recorded, `CompetitionClosed`
    /// if the competition is already cancelled.
    pub async fn cancel_competition(&self, id: CompetitionId) -> Result<Competition> {
        let competition = self.store.cancel_competition(id).await?;
        warn!(
            competition_id = %id,
            tickets_sold = competition.tickets_sold,
            "Competition cancelled"
        );
        Ok(competition)
    }

    // ────────────────────────────────────────────────────────────
    // Allocation surface
    // ────────────────────────────────────────────────────────────

    /// Ascending numbers of the tickets currently available in a pool.
    ///
    /// # Errors
    ///
    /// Returns `CompetitionNotFound` if the competition does not exist.
    pub async fn list_available(&self, competition_id: CompetitionId) -> Result<Vec<TicketNumber>> {
        self.store.available_numbers(competition_id).await
    }

    /// Reserve specific ticket numbers for a holder.
    ///
    /// The hold lasts for `window` (the configured default when `None`),
    /// after which the sweeper reclaims it. Validation happens before the
    /// lock is taken; a set containing any unavailable ticket fails whole
    /// with `TicketUnavailable` and reserves nothing.
    ///
    /// # Errors
    ///
    /// `EmptyTicketSet` / `DuplicateTicketNumbers` / `OutOfRange` /
    /// `CompetitionClosed` on validation, `LockTimeout` under contention,
    /// `TicketUnavailable` if any requested ticket is already held.
    pub async fn reserve(
        &self,
        competition_id: CompetitionId,
        numbers: &[TicketNumber],
        holder: &HolderId,
        window: Option<Duration>,
    ) -> Result<Reservation> {
        let numbers = validate_ticket_set(numbers)?;

        let competition = self.store.competition(competition_id).await?;
        if !competition.is_open_for_entry() {
            return Err(TicketError::CompetitionClosed {
                status: competition.status,
            });
        }
        for &number in &numbers {
            if !competition.contains_number(number) {
                return Err(TicketError::OutOfRange {
                    number,
                    max_tickets: competition.max_tickets,
                });
            }
        }

        let _guard = self.locks.lock_tickets(competition_id, &numbers).await?;

        // Check the whole set first so a conflict reserves nothing.
        let mut tickets = Vec::with_capacity(numbers.len());
        for &number in &numbers {
            let ticket = self.store.ticket_by_number(competition_id, number).await?;
            if ticket.status != TicketStatus::Available {
                counter!("raffle_reservation_conflicts_total").increment(1);
                return Err(TicketError::TicketUnavailable { number });
            }
            tickets.push(ticket);
        }

        let expires_at = self.clock.now() + window.unwrap_or(self.config.reservation_window);
        let transition = TicketTransition::Reserve {
            holder: holder.clone(),
            reserved_until: expires_at,
        };
        let mut reserved: Vec<TicketId> = Vec::with_capacity(tickets.len());
        for ticket in &tickets {
            match self.store.apply_transition(ticket.id, &transition).await {
                Ok(_) => reserved.push(ticket.id),
                Err(err) => {
                    // Lost a race despite the advisory lock (e.g. another
                    // process over the same store). Roll back our part of
                    // the set before surfacing the conflict.
                    self.rollback_reservations(&reserved, holder).await;
                    counter!("raffle_reservation_conflicts_total").increment(1);
                    return Err(match err {
                        TicketError::InvalidTransition { .. } => TicketError::TicketUnavailable {
                            number: ticket.number,
                        },
                        other => other,
                    });
                }
            }
        }

        counter!("raffle_reservations_total").increment(1);
        counter!("raffle_tickets_reserved_total").increment(reserved.len() as u64);
        info!(
            competition_id = %competition_id,
            holder = %holder,
            tickets = reserved.len(),
            expires_at = %expires_at,
            "Tickets reserved"
        );
        Ok(Reservation {
            competition_id,
            ticket_numbers: numbers,
            expires_at,
        })
    }

    /// Release a holder's reservations on the given numbers.
    ///
    /// Idempotent: numbers not currently reserved by this holder are
    /// skipped, not errors. Returns the numbers actually released.
    ///
    /// # Errors
    ///
    /// `EmptyTicketSet` / `OutOfRange` on validation, `LockTimeout` under
    /// contention.
    pub async fn release(
        &self,
        competition_id: CompetitionId,
        numbers: &[TicketNumber],
        holder: &HolderId,
    ) -> Result<Vec<TicketNumber>> {
        let numbers = validate_ticket_set(numbers)?;
        let _guard = self.locks.lock_tickets(competition_id, &numbers).await?;

        let transition = TicketTransition::Release {
            authority: ReleaseAuthority::Holder(holder.clone()),
        };
        let mut released = Vec::new();
        for &number in &numbers {
            let ticket = self.store.ticket_by_number(competition_id, number).await?;
            if !ticket.is_reserved_by(holder) {
                continue;
            }
            match self.store.apply_transition(ticket.id, &transition).await {
                Ok(_) => released.push(number),
                // Racing sweep or purchase got there first; releasing is
                // best-effort so this stays a skip.
                Err(TicketError::InvalidTransition { .. }) => {}
                Err(other) => return Err(other),
            }
        }

        counter!("raffle_releases_total").increment(1);
        info!(
            competition_id = %competition_id,
            holder = %holder,
            released = released.len(),
            "Reservations released"
        );
        Ok(released)
    }

    /// Purchase a set of tickets the purchaser has reserved, creating the
    /// owning entry atomically.
    ///
    /// The payment gateway has already confirmed funds by the time this is
    /// called; this transition is the allocation-side commit.
    ///
    /// # Errors
    ///
    /// `EmptyTicketSet` / `DuplicateTicketNumbers` / `MixedCompetitions` on
    /// validation, `LockTimeout` under contention, `TicketNotReserved` if any
    /// ticket is not reserved by the purchaser (nothing is purchased in that
    /// case).
    pub async fn purchase(
        &self,
        ticket_ids: &[TicketId],
        purchaser: UserId,
    ) -> Result<PurchaseReceipt> {
        if ticket_ids.is_empty() {
            return Err(TicketError::EmptyTicketSet);
        }
        let tickets = self.store.tickets_by_ids(ticket_ids).await?;
        // A repeated id would double-count the sold counter downstream.
        let mut by_id = tickets.clone();
        by_id.sort_by_key(|t| t.id);
        for pair in by_id.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(TicketError::DuplicateTicketNumbers {
                    number: pair[0].number,
                });
            }
        }
        let competition_id = tickets[0].competition_id;
        if tickets.iter().any(|t| t.competition_id != competition_id) {
            return Err(TicketError::MixedCompetitions);
        }

        let numbers: Vec<TicketNumber> = tickets.iter().map(|t| t.number).collect();
        let _guard = self.locks.lock_tickets(competition_id, &numbers).await?;

        let now = self.clock.now();
        let (tickets, entry) = self
            .store
            .commit_purchase(competition_id, ticket_ids, purchaser, now)
            .await?;

        counter!("raffle_purchases_total").increment(1);
        counter!("raffle_tickets_purchased_total").increment(tickets.len() as u64);
        info!(
            competition_id = %competition_id,
            entry_id = %entry.id,
            user_id = %purchaser,
            tickets = tickets.len(),
            "Purchase committed"
        );
        Ok(PurchaseReceipt { tickets, entry })
    }

    async fn rollback_reservations(&self, ticket_ids: &[TicketId], holder: &HolderId) {
        let transition = TicketTransition::Release {
            authority: ReleaseAuthority::Holder(holder.clone()),
        };
        for &ticket_id in ticket_ids {
            if let Err(err) = self.store.apply_transition(ticket_id, &transition).await {
                warn!(
                    ticket_id = %ticket_id,
                    error = %err,
                    "Failed to roll back reservation after partial conflict"
                );
            }
        }
    }
}

/// Sort, dedupe-check, and reject empty ticket-number sets.
fn validate_ticket_set(numbers: &[TicketNumber]) -> Result<Vec<TicketNumber>> {
    if numbers.is_empty() {
        return Err(TicketError::EmptyTicketSet);
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] {
            return Err(TicketError::DuplicateTicketNumbers { number: pair[0] });
        }
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn ticket_set_validation_sorts_and_rejects() {
        assert_eq!(
            validate_ticket_set(&[]).unwrap_err(),
            TicketError::EmptyTicketSet
        );
        assert_eq!(
            validate_ticket_set(&[TicketNumber::new(3), TicketNumber::new(1)]).unwrap(),
            vec![TicketNumber::new(1), TicketNumber::new(3)]
        );
        assert_eq!(
            validate_ticket_set(&[TicketNumber::new(2), TicketNumber::new(2)]).unwrap_err(),
            TicketError::DuplicateTicketNumbers {
                number: TicketNumber::new(2)
            }
        );
    }
}
