//! # Raffle Runtime
//!
//! The operational half of the ticket allocation & draw engine: advisory
//! reservation locking, the [`TicketEngine`] operation surface, the expiry
//! sweeper, and the draw engine with its periodic scanner.
//!
//! ## Concurrency model
//!
//! Multiple request workers call into one [`TicketEngine`] while two
//! independent background timers run beside them: the
//! [`ReservationSweeper`] reclaiming lapsed holds, and the [`DrawScanner`]
//! finalizing due competitions. Only lock acquisition blocks (bounded
//! polling); everything else is single-shot. Correctness never depends on
//! the lock table, because every mutation is a guarded conditional update in
//! the store; the locks exist to keep conflicting requests from burning
//! retries against each other.
//!
//! ## Example
//!
//! ```
//! use raffle_core::{InMemoryTicketPool, HolderId, environment::SystemClock, types::TicketNumber};
//! use raffle_runtime::{EngineConfig, TicketEngine};
//! use raffle_testing::CompetitionBuilder;
//! use std::sync::Arc;
//!
//! # async fn example() -> raffle_core::Result<()> {
//! let engine = TicketEngine::new(
//!     Arc::new(InMemoryTicketPool::new()),
//!     Arc::new(SystemClock),
//!     EngineConfig::default(),
//! );
//!
//! let competition = engine
//!     .create_competition(CompetitionBuilder::new().max_tickets(100).build())
//!     .await?;
//! engine.open_competition(competition.id).await?;
//!
//! let reservation = engine
//!     .reserve(
//!         competition.id,
//!         &[TicketNumber::new(7), TicketNumber::new(8)],
//!         &HolderId::new("session-1"),
//!         None,
//!     )
//!     .await?;
//! assert_eq!(reservation.ticket_numbers.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod draw;
pub mod engine;
pub mod lock;
pub mod metrics;
pub mod sweeper;

pub use config::{EngineConfig, LockConfig};
pub use draw::{DrawEngine, DrawOutcome, DrawScanner, ScanReport};
pub use engine::{PurchaseReceipt, Reservation, TicketEngine};
pub use lock::{LockGuard, ReservationLockManager};
pub use sweeper::{ReservationSweeper, SweepReport};
