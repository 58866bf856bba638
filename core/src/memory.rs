//! In-memory ticket pool store.
//!
//! The whole pool sits behind one mutex, which makes this store the "single
//! serialized allocation authority": every guarded transition and both
//! composite units (purchase, draw) execute inside one critical section, so
//! conditional updates are trivially atomic. It backs single-process
//! deployments and every test in the workspace.

use crate::error::{Result, TicketError};
use crate::store::TicketPoolStore;
use crate::transitions::TicketTransition;
use crate::types::{
    Competition, CompetitionId, CompetitionStatus, Entry, EntryId, EntryStatus, FulfillmentStatus,
    NewCompetition, Ticket, TicketId, TicketNumber, TicketStatus, UserId, Win, WinId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Default)]
struct Inner {
    competitions: HashMap<CompetitionId, Competition>,
    tickets: HashMap<TicketId, Ticket>,
    numbers: HashMap<(CompetitionId, u32), TicketId>,
    entries: HashMap<EntryId, Entry>,
    entry_order: Vec<EntryId>,
    wins: HashMap<WinId, Win>,
}

impl Inner {
    fn competition(&self, id: CompetitionId) -> Result<&Competition> {
        self.competitions
            .get(&id)
            .ok_or(TicketError::CompetitionNotFound { competition_id: id })
    }

    fn ticket(&self, id: TicketId) -> Result<&Ticket> {
        self.tickets
            .get(&id)
            .ok_or(TicketError::TicketNotFound { ticket_id: id })
    }
}

/// Single-process [`TicketPoolStore`] with every operation serialized behind
/// one mutex.
#[derive(Default)]
pub struct InMemoryTicketPool {
    inner: Mutex<Inner>,
}

impl InMemoryTicketPool {
    /// Create an empty pool store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a panic mid-mutation elsewhere; the data is
        // still the last consistent snapshot, so recover rather than wedge.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TicketPoolStore for InMemoryTicketPool {
    async fn create_competition(&self, new: NewCompetition) -> Result<Competition> {
        if new.max_tickets == 0 {
            return Err(TicketError::ZeroCapacity);
        }
        let competition = Competition {
            id: CompetitionId::new(),
            name: new.name,
            max_tickets: new.max_tickets,
            ticket_price: new.ticket_price,
            draw_date: new.draw_date,
            tickets_sold: 0,
            status: CompetitionStatus::Draft,
            winner_user_id: None,
            created_at: Utc::now(),
        };

        let mut inner = self.lock();
        for number in 1..=new.max_tickets {
            let ticket = Ticket::available(
                competition.id,
                TicketId::new(),
                TicketNumber::new(number),
            );
            inner.numbers.insert((competition.id, number), ticket.id);
            inner.tickets.insert(ticket.id, ticket);
        }
        inner.competitions.insert(competition.id, competition.clone());
        debug!(
            competition_id = %competition.id,
            max_tickets = competition.max_tickets,
            "Competition pool created"
        );
        Ok(competition)
    }

    async fn competition(&self, id: CompetitionId) -> Result<Competition> {
        self.lock().competition(id).cloned()
    }

    async fn open_competition(&self, id: CompetitionId) -> Result<Competition> {
        let mut inner = self.lock();
        let status = inner.competition(id)?.status;
        if status != CompetitionStatus::Draft {
            return Err(TicketError::CompetitionClosed { status });
        }
        let competition = inner
            .competitions
            .get_mut(&id)
            .ok_or(TicketError::CompetitionNotFound { competition_id: id })?;
        competition.status = CompetitionStatus::Live;
        Ok(competition.clone())
    }

    async fn list_competitions(&self) -> Result<Vec<Competition>> {
        let inner = self.lock();
        let mut competitions: Vec<Competition> = inner.competitions.values().cloned().collect();
        competitions.sort_by_key(|c| c.created_at);
        Ok(competitions)
    }

    async fn cancel_competition(&self, id: CompetitionId) -> Result<Competition> {
        let mut inner = self.lock();
        let current = inner.competition(id)?;
        if current.winner_user_id.is_some() {
            return Err(TicketError::AlreadyDrawn { competition_id: id });
        }
        if current.status == CompetitionStatus::Cancelled {
            return Err(TicketError::CompetitionClosed {
                status: CompetitionStatus::Cancelled,
            });
        }
        let competition = inner
            .competitions
            .get_mut(&id)
            .ok_or(TicketError::CompetitionNotFound { competition_id: id })?;
        competition.status = CompetitionStatus::Cancelled;
        Ok(competition.clone())
    }

    async fn competitions_due_for_draw(&self, now: DateTime<Utc>) -> Result<Vec<Competition>> {
        let inner = self.lock();
        let mut due: Vec<Competition> = inner
            .competitions
            .values()
            .filter(|c| c.is_due_for_draw(now))
            .cloned()
            .collect();
        due.sort_by_key(|c| c.draw_date);
        Ok(due)
    }

    async fn tickets(
        &self,
        competition_id: CompetitionId,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>> {
        let inner = self.lock();
        inner.competition(competition_id)?;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.competition_id == competition_id)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.number);
        Ok(tickets)
    }

    async fn ticket_by_number(
        &self,
        competition_id: CompetitionId,
        number: TicketNumber,
    ) -> Result<Ticket> {
        let inner = self.lock();
        let competition = inner.competition(competition_id)?;
        if !competition.contains_number(number) {
            return Err(TicketError::OutOfRange {
                number,
                max_tickets: competition.max_tickets,
            });
        }
        let id = inner
            .numbers
            .get(&(competition_id, number.value()))
            .copied()
            .ok_or_else(|| {
                TicketError::Storage(format!(
                    "pool invariant breach: no ticket at number {number}"
                ))
            })?;
        inner.ticket(id).cloned()
    }

    async fn tickets_by_ids(&self, ids: &[TicketId]) -> Result<Vec<Ticket>> {
        let inner = self.lock();
        ids.iter().map(|id| inner.ticket(*id).cloned()).collect()
    }

    async fn apply_transition(
        &self,
        ticket_id: TicketId,
        transition: &TicketTransition,
    ) -> Result<Ticket> {
        let mut inner = self.lock();
        let updated = transition.apply(inner.ticket(ticket_id)?)?;
        inner.tickets.insert(ticket_id, updated.clone());
        Ok(updated)
    }

    async fn expired_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let inner = self.lock();
        let mut expired: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by_key(|t| (t.competition_id, t.number));
        Ok(expired)
    }

    async fn commit_purchase(
        &self,
        competition_id: CompetitionId,
        ticket_ids: &[TicketId],
        purchaser: UserId,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Ticket>, Entry)> {
        let mut inner = self.lock();
        inner.competition(competition_id)?;

        // Validate the whole set before touching anything, so a mismatch
        // leaves no half-applied purchase. Each ticket is checked against the
        // accumulating state, not the starting snapshot: a repeated id sees
        // its own earlier purchase and fails the precondition, the same way a
        // second conditional update would match no row.
        let transition = TicketTransition::Purchase {
            purchaser: purchaser.holder_id(),
            purchased_at: now,
        };
        let mut updated: Vec<Ticket> = Vec::with_capacity(ticket_ids.len());
        for id in ticket_ids {
            let current = match updated.iter().find(|t| t.id == *id) {
                Some(ticket) => ticket.clone(),
                None => inner.ticket(*id)?.clone(),
            };
            if current.competition_id != competition_id {
                return Err(TicketError::MixedCompetitions);
            }
            let after = transition.apply(&current).map_err(|err| match err {
                TicketError::InvalidTransition { .. } => {
                    TicketError::TicketNotReserved { ticket_id: *id }
                }
                other => other,
            })?;
            updated.push(after);
        }

        for ticket in &updated {
            inner.tickets.insert(ticket.id, ticket.clone());
        }
        let sold = u32::try_from(updated.len()).unwrap_or(u32::MAX);
        if let Some(competition) = inner.competitions.get_mut(&competition_id) {
            competition.tickets_sold = competition.tickets_sold.saturating_add(sold);
        }

        let entry = Entry {
            id: EntryId::new(),
            user_id: purchaser,
            competition_id,
            ticket_ids: ticket_ids.to_vec(),
            status: EntryStatus::Active,
            created_at: now,
        };
        inner.entry_order.push(entry.id);
        inner.entries.insert(entry.id, entry.clone());
        Ok((updated, entry))
    }

    async fn record_draw(
        &self,
        competition_id: CompetitionId,
        winning_entry_id: EntryId,
        winning_ticket_id: TicketId,
        winner: UserId,
        now: DateTime<Utc>,
    ) -> Result<Win> {
        let mut inner = self.lock();
        let competition = inner.competition(competition_id)?;
        // The winner column is the draw's compare-and-swap: set exactly once.
        if competition.winner_user_id.is_some() {
            return Err(TicketError::AlreadyDrawn { competition_id });
        }

        if let Some(competition) = inner.competitions.get_mut(&competition_id) {
            competition.winner_user_id = Some(winner);
            competition.status = CompetitionStatus::Completed;
        }
        for entry in inner
            .entries
            .values_mut()
            .filter(|e| e.competition_id == competition_id)
        {
            entry.status = if entry.id == winning_entry_id {
                EntryStatus::Won
            } else {
                EntryStatus::Lost
            };
        }

        let win = Win {
            id: WinId::new(),
            user_id: winner,
            competition_id,
            entry_id: winning_entry_id,
            ticket_id: winning_ticket_id,
            fulfillment: FulfillmentStatus::Pending,
            created_at: now,
        };
        inner.wins.insert(win.id, win.clone());
        debug!(competition_id = %competition_id, winner = %winner, "Draw recorded");
        Ok(win)
    }

    async fn entries(&self, competition_id: CompetitionId) -> Result<Vec<Entry>> {
        let inner = self.lock();
        Ok(inner
            .entry_order
            .iter()
            .filter_map(|id| inner.entries.get(id))
            .filter(|e| e.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn entry_owning_ticket(&self, ticket_id: TicketId) -> Result<Entry> {
        let inner = self.lock();
        inner
            .entries
            .values()
            .find(|e| e.ticket_ids.contains(&ticket_id))
            .cloned()
            .ok_or(TicketError::EntryNotFound { ticket_id })
    }

    async fn update_fulfillment(&self, win_id: WinId, status: FulfillmentStatus) -> Result<Win> {
        let mut inner = self.lock();
        let win = inner
            .wins
            .get_mut(&win_id)
            .ok_or_else(|| TicketError::Storage(format!("win not found: {win_id}")))?;
        win.fulfillment = status;
        Ok(win.clone())
    }
}


#[cfg(test)]
mod conservation {
    #![allow(clippy::unwrap_used)]

    //! Property: for any sequence of guarded transitions, the pool's status
    //! counts always sum to `max_tickets` and no ticket skips a state.

    use super::*;
    use crate::transitions::ReleaseAuthority;
    use crate::types::{HolderId, Money};
    use chrono::Duration;
    use proptest::prelude::*;

    const POOL_SIZE: u32 = 5;

    #[derive(Clone, Debug)]
    enum Op {
        Reserve { number: u32, holder: u8 },
        Release { number: u8, holder: u8 },
        ReleaseBySweeper { number: u8 },
        Purchase { number: u8, holder: u8 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1..=POOL_SIZE + 2, 0..3u8).prop_map(|(number, holder)| Op::Reserve { number, holder }),
            (1..=POOL_SIZE as u8, 0..3u8)
                .prop_map(|(number, holder)| Op::Release { number, holder }),
            (1..=POOL_SIZE as u8).prop_map(|number| Op::ReleaseBySweeper { number }),
            (1..=POOL_SIZE as u8, 0..3u8)
                .prop_map(|(number, holder)| Op::Purchase { number, holder }),
        ]
    }

    fn holder(idx: u8) -> HolderId {
        HolderId::new(format!("holder-{idx}"))
    }

    async fn run_ops(ops: Vec<Op>) {
        let store = InMemoryTicketPool::new();
        let competition = store
            .create_competition(NewCompetition {
                name: "prop".to_string(),
                max_tickets: POOL_SIZE,
                ticket_price: Money::from_minor_units(100),
                draw_date: Utc::now() + Duration::days(1),
            })
            .await
            .unwrap();
        store.open_competition(competition.id).await.unwrap();

        for op in ops {
            let result = match op {
                Op::Reserve { number, holder: h } => store
                    .ticket_by_number(competition.id, TicketNumber::new(number))
                    .await
                    .map(|t| (t, holder(h))),
                Op::Release { number, holder: h }
                | Op::Purchase { number, holder: h } => store
                    .ticket_by_number(competition.id, TicketNumber::new(u32::from(number)))
                    .await
                    .map(|t| (t, holder(h))),
                Op::ReleaseBySweeper { number } => store
                    .ticket_by_number(competition.id, TicketNumber::new(u32::from(number)))
                    .await
                    .map(|t| (t, HolderId::new("sweeper"))),
            };
            let Ok((ticket, who)) = result else {
                continue; // out-of-range probe; the pool must be untouched
            };

            let transition = match op {
                Op::Reserve { .. } => TicketTransition::Reserve {
                    holder: who,
                    reserved_until: Utc::now() + Duration::minutes(10),
                },
                Op::Release { .. } => TicketTransition::Release {
                    authority: ReleaseAuthority::Holder(who),
                },
                Op::ReleaseBySweeper { .. } => TicketTransition::Release {
                    authority: ReleaseAuthority::Sweeper,
                },
                Op::Purchase { .. } => TicketTransition::Purchase {
                    purchaser: who,
                    purchased_at: Utc::now(),
                },
            };
            // Precondition mismatches are expected; corruption is not.
            let _ = store.apply_transition(ticket.id, &transition).await;

            let tickets = store.tickets(competition.id, None).await.unwrap();
            assert_eq!(tickets.len(), POOL_SIZE as usize);
            for t in &tickets {
                match t.status {
                    TicketStatus::Available => {
                        assert!(t.holder.is_none());
                        assert!(t.reserved_until.is_none());
                    }
                    TicketStatus::Reserved => {
                        assert!(t.holder.is_some());
                        assert!(t.reserved_until.is_some());
                    }
                    TicketStatus::Purchased => {
                        assert!(t.holder.is_some());
                        assert!(t.reserved_until.is_none());
                        assert!(t.purchased_at.is_some());
                    }
                }
            }
        }
    }

    proptest! {
        #[test]
        fn pool_counts_always_sum_to_capacity(ops in proptest::collection::vec(op_strategy(), 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(run_ops(ops));
        }
    }
}
