//! The ticket pool store contract.
//!
//! One implementation of [`TicketPoolStore`] is the single allocation
//! authority for a competition's pool. Implementations must make every
//! guarded transition a single conditional update: a concurrent reader can
//! never observe a half-applied transition, and two conflicting transitions
//! can never both apply.

use crate::error::Result;
use crate::transitions::TicketTransition;
use crate::types::{
    Competition, CompetitionId, Entry, EntryId, FulfillmentStatus, HolderId, NewCompetition,
    Ticket, TicketId, TicketNumber, TicketStatus, UserId, Win, WinId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable record of every ticket's state and holder, plus the entries and
/// wins that hang off purchases and draws.
///
/// The two composite operations ([`commit_purchase`](Self::commit_purchase)
/// and [`record_draw`](Self::record_draw)) exist because their effects are
/// specified as atomic units: an entry is never observable without its
/// purchased tickets, and a winner is never observable without the entry
/// status fan-out.
#[async_trait]
pub trait TicketPoolStore: Send + Sync {
    // ────────────────────────────────────────────────────────────
    // Competitions
    // ────────────────────────────────────────────────────────────

    /// Create a competition and bulk-create its pool: `max_tickets` tickets
    /// numbered `1..=max_tickets`, all available. The competition starts in
    /// draft.
    ///
    /// # Errors
    ///
    /// Returns `ZeroCapacity` if `max_tickets` is zero.
    async fn create_competition(&self, new: NewCompetition) -> Result<Competition>;

    /// Fetch one competition.
    ///
    /// # Errors
    ///
    /// Returns `CompetitionNotFound` if it does not exist.
    async fn competition(&self, id: CompetitionId) -> Result<Competition>;

    /// Move a draft competition live so it accepts entries.
    ///
    /// # Errors
    ///
    /// Returns `CompetitionClosed` if the competition is not in draft.
    async fn open_competition(&self, id: CompetitionId) -> Result<Competition>;

    /// All competitions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_competitions(&self) -> Result<Vec<Competition>>;

    /// Withdraw a competition before its draw. Conditional on no winner
    /// being recorded; cancelled pools stop accepting entries and are never
    /// due for a draw.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyDrawn` if a winner is recorded, `CompetitionClosed`
    /// if the competition is already cancelled.
    async fn cancel_competition(&self, id: CompetitionId) -> Result<Competition>;

    /// All live competitions whose draw trigger condition holds at `now`
    /// (draw date passed or pool sold out, no winner recorded).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn competitions_due_for_draw(&self, now: DateTime<Utc>) -> Result<Vec<Competition>>;

    // ────────────────────────────────────────────────────────────
    // Tickets
    // ────────────────────────────────────────────────────────────

    /// List a competition's tickets in ascending number order, optionally
    /// filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `CompetitionNotFound` if the competition does not exist.
    async fn tickets(
        &self,
        competition_id: CompetitionId,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>>;

    /// Fetch one ticket by competition and pool number.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the number is outside `[1, max_tickets]`.
    async fn ticket_by_number(
        &self,
        competition_id: CompetitionId,
        number: TicketNumber,
    ) -> Result<Ticket>;

    /// Fetch tickets by id, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `TicketNotFound` for the first missing id.
    async fn tickets_by_ids(&self, ids: &[TicketId]) -> Result<Vec<Ticket>>;

    /// Apply one guarded transition as a single conditional update.
    ///
    /// The update only lands if the ticket's current status (and holder,
    /// where relevant) still satisfies the transition's precondition; a
    /// concurrent transition that got there first makes this one fail
    /// cleanly instead of corrupting state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition`/`TicketNotReserved` on a precondition
    /// mismatch, `TicketNotFound` if the ticket does not exist.
    async fn apply_transition(
        &self,
        ticket_id: TicketId,
        transition: &TicketTransition,
    ) -> Result<Ticket>;

    /// All reserved tickets whose hold deadline has passed at `now`, across
    /// every competition.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn expired_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>>;

    // ────────────────────────────────────────────────────────────
    // Purchase and Draw (composite atomic units)
    // ────────────────────────────────────────────────────────────

    /// Atomically purchase a set of reserved tickets: per-ticket guarded
    /// `reserved → purchased`, the competition's sold counter incremented by
    /// the set size, and the owning entry created, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `TicketNotReserved` if any ticket is not currently reserved
    /// by the purchaser and `MixedCompetitions` if any ticket belongs to a
    /// different competition; no ticket is modified in either case.
    async fn commit_purchase(
        &self,
        competition_id: CompetitionId,
        ticket_ids: &[TicketId],
        purchaser: UserId,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Ticket>, Entry)>;

    /// Atomically finalize a draw, conditional on no winner being recorded:
    /// sets `winner_user_id` and completed status exactly once, marks the
    /// winning entry won and every other entry for the competition lost, and
    /// creates a pending win record.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyDrawn` if a winner is already recorded; nothing is
    /// modified in that case.
    async fn record_draw(
        &self,
        competition_id: CompetitionId,
        winning_entry_id: EntryId,
        winning_ticket_id: TicketId,
        winner: UserId,
        now: DateTime<Utc>,
    ) -> Result<Win>;

    // ────────────────────────────────────────────────────────────
    // Entries and Wins
    // ────────────────────────────────────────────────────────────

    /// All entries for a competition, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn entries(&self, competition_id: CompetitionId) -> Result<Vec<Entry>>;

    /// The entry that owns a purchased ticket.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if no entry contains the ticket.
    async fn entry_owning_ticket(&self, ticket_id: TicketId) -> Result<Entry>;

    /// Advance a win's fulfillment status (downstream prize handling).
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the win does not exist.
    async fn update_fulfillment(&self, win_id: WinId, status: FulfillmentStatus) -> Result<Win>;
}

/// Convenience queries shared by every store implementation.
#[async_trait]
pub trait TicketPoolStoreExt: TicketPoolStore {
    /// Ascending numbers of the competition's available tickets.
    ///
    /// # Errors
    ///
    /// Returns `CompetitionNotFound` if the competition does not exist.
    async fn available_numbers(&self, competition_id: CompetitionId) -> Result<Vec<TicketNumber>> {
        let tickets = self
            .tickets(competition_id, Some(TicketStatus::Available))
            .await?;
        Ok(tickets.into_iter().map(|t| t.number).collect())
    }

    /// All tickets currently reserved by the given holder in a competition.
    ///
    /// # Errors
    ///
    /// Returns `CompetitionNotFound` if the competition does not exist.
    async fn reservations_of(
        &self,
        competition_id: CompetitionId,
        holder: &HolderId,
    ) -> Result<Vec<Ticket>> {
        let tickets = self
            .tickets(competition_id, Some(TicketStatus::Reserved))
            .await?;
        Ok(tickets
            .into_iter()
            .filter(|t| t.holder.as_ref() == Some(holder))
            .collect())
    }
}

#[async_trait]
impl<S: TicketPoolStore + ?Sized> TicketPoolStoreExt for S {}
