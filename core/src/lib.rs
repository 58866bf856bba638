//! # Raffle Core
//!
//! Domain model and allocation contract for the ticket allocation & draw
//! engine: competitions sell a fixed pool of numbered tickets into time-boxed
//! prize draws.
//!
//! ## Core Concepts
//!
//! - **Ticket pool**: `max_tickets` numbered tickets per competition, created
//!   in bulk and never deleted while the competition exists.
//! - **Guarded transitions**: every status mutation is a [`TicketTransition`]
//!   applied as a single conditional update against the ticket's current
//!   status, which is the only thing that makes concurrent sweeps,
//!   purchases, and reservations safe.
//! - **Store contract**: [`TicketPoolStore`] is the single allocation
//!   authority for a pool; [`InMemoryTicketPool`] serializes it behind one
//!   mutex, `raffle-postgres` pushes the same conditional updates into SQL.
//!
//! ## Example
//!
//! ```
//! use raffle_core::{
//!     InMemoryTicketPool, NewCompetition, TicketPoolStore, TicketPoolStoreExt,
//!     types::Money,
//! };
//! use chrono::{Duration, Utc};
//!
//! # async fn example() -> raffle_core::Result<()> {
//! let store = InMemoryTicketPool::new();
//! let competition = store
//!     .create_competition(NewCompetition {
//!         name: "Win a toaster".to_string(),
//!         max_tickets: 100,
//!         ticket_price: Money::from_minor_units(250),
//!         draw_date: Utc::now() + Duration::days(7),
//!     })
//!     .await?;
//! store.open_competition(competition.id).await?;
//!
//! let available = store.available_numbers(competition.id).await?;
//! assert_eq!(available.len(), 100);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod store;
pub mod transitions;
pub mod types;

pub use error::{Result, TicketError};
pub use memory::InMemoryTicketPool;
pub use store::{TicketPoolStore, TicketPoolStoreExt};
pub use transitions::{ReleaseAuthority, TicketTransition};
pub use types::{
    Competition, CompetitionId, CompetitionStatus, Entry, EntryId, EntryStatus, FulfillmentStatus,
    HolderId, NewCompetition, Ticket, TicketId, TicketNumber, TicketStatus, UserId, Win, WinId,
};

/// Environment module - dependency injection traits
///
/// External dependencies of the engine are abstracted behind traits and
/// injected where they are consumed, so tests can substitute deterministic
/// implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Reservation deadlines, sweep cutoffs, and draw triggers all read time
    /// through this seam.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
