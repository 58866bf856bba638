//! Error types for ticket pool, reservation, and draw operations.

use crate::types::{CompetitionId, CompetitionStatus, TicketId, TicketNumber, TicketStatus};
use thiserror::Error;

/// Result type alias for ticket engine operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Error taxonomy for the allocation and draw subsystem.
///
/// Organized by how callers should react: validation errors are rejected
/// before any lock is taken, contention errors are retryable with backoff,
/// and state-conflict errors are terminal for the request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TicketError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors (rejected before any lock is taken)
    // ═══════════════════════════════════════════════════════════

    /// Requested ticket number falls outside the competition's pool.
    #[error("Ticket number {number} is out of range (pool is 1..={max_tickets})")]
    OutOfRange {
        /// The offending number
        number: TicketNumber,
        /// The pool's capacity
        max_tickets: u32,
    },

    /// A reserve/release/purchase request named no tickets.
    #[error("Ticket set is empty")]
    EmptyTicketSet,

    /// A request named the same ticket number more than once.
    #[error("Ticket number {number} appears more than once in the request")]
    DuplicateTicketNumbers {
        /// The repeated number
        number: TicketNumber,
    },

    /// A purchase named tickets from more than one competition.
    #[error("Tickets span multiple competitions; an entry belongs to exactly one")]
    MixedCompetitions,

    /// A competition was created with no tickets to sell.
    #[error("Competition capacity must be at least 1 ticket")]
    ZeroCapacity,

    // ═══════════════════════════════════════════════════════════
    // Contention Errors (retryable with backoff)
    // ═══════════════════════════════════════════════════════════

    /// A conflicting hold did not clear within the bounded wait.
    #[error("Timed out waiting for a reservation lock on competition {competition_id}")]
    LockTimeout {
        /// The contended competition
        competition_id: CompetitionId,
    },

    // ═══════════════════════════════════════════════════════════
    // State-Conflict Errors (terminal for this request)
    // ═══════════════════════════════════════════════════════════

    /// A ticket in the requested set is not available.
    #[error("Ticket {number} is not available")]
    TicketUnavailable {
        /// The contested number
        number: TicketNumber,
    },

    /// A ticket in a purchase is not reserved by the purchaser.
    #[error("Ticket {ticket_id} is not reserved by the purchaser")]
    TicketNotReserved {
        /// The offending ticket
        ticket_id: TicketId,
    },

    /// A guarded transition's precondition did not match the current status.
    #[error("Invalid transition: ticket is {current}, transition requires {required}")]
    InvalidTransition {
        /// Status observed at update time
        current: TicketStatus,
        /// Status the transition requires
        required: TicketStatus,
    },

    /// The competition is not accepting entries.
    #[error("Competition is not open for entry (status: {status})")]
    CompetitionClosed {
        /// Current competition status
        status: CompetitionStatus,
    },

    /// The competition already has a recorded winner.
    #[error("Competition {competition_id} has already been drawn")]
    AlreadyDrawn {
        /// The drawn competition
        competition_id: CompetitionId,
    },

    // ═══════════════════════════════════════════════════════════
    // Draw Errors
    // ═══════════════════════════════════════════════════════════

    /// The draw trigger condition does not hold yet.
    #[error("Competition {competition_id} is not yet due for its draw")]
    NotYetDue {
        /// The competition in question
        competition_id: CompetitionId,
    },

    /// No purchased tickets exist to draw from.
    #[error("Competition {competition_id} has no purchased tickets to draw")]
    NoEligibleTickets {
        /// The competition in question
        competition_id: CompetitionId,
    },

    // ═══════════════════════════════════════════════════════════
    // Not Found
    // ═══════════════════════════════════════════════════════════

    /// Competition does not exist.
    #[error("Competition not found: {competition_id}")]
    CompetitionNotFound {
        /// The missing id
        competition_id: CompetitionId,
    },

    /// Ticket does not exist.
    #[error("Ticket not found: {ticket_id}")]
    TicketNotFound {
        /// The missing id
        ticket_id: TicketId,
    },

    /// No entry owns the given ticket.
    #[error("No entry owns ticket {ticket_id}")]
    EntryNotFound {
        /// The unowned ticket
        ticket_id: TicketId,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TicketError {
    /// Whether the caller may retry this request with backoff.
    ///
    /// Only contention errors qualify; state conflicts must be surfaced
    /// as-is and validation errors will never succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}
