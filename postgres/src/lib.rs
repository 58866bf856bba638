//! `PostgreSQL` ticket pool store.
//!
//! Implements the `TicketPoolStore` trait from `raffle-core` over a sqlx
//! connection pool. Every guarded transition is a single conditional
//! `UPDATE ... WHERE status = <precondition>`: the compare-and-swap lives in
//! the database, so correctness survives multiple engine processes sharing
//! one pool even though each process's lock table is local to it.
//!
//! The composite units (purchase, draw) run in transactions; a precondition
//! mismatch on any row rolls the whole unit back.
//!
//! # Example
//!
//! ```ignore
//! use raffle_postgres::PostgresTicketPool;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresTicketPool::connect("postgres://localhost/raffle").await?;
//!     store.ensure_schema().await?;
//!     Ok(())
//! }
//! ```

pub mod store;

pub use store::PostgresTicketPool;
