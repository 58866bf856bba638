//! # Raffle Testing
//!
//! Testing utilities for the raffle workspace.
//!
//! This crate provides:
//! - Deterministic clocks (fixed and manually advanced)
//! - Builders for competitions and seeded ticket pools
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```
//! use raffle_testing::{SteppingClock, test_clock};
//! use raffle_core::environment::Clock;
//! use chrono::Duration;
//!
//! let clock = SteppingClock::at(test_clock().now());
//! let before = clock.now();
//! clock.advance(Duration::minutes(11));
//! assert_eq!(clock.now() - before, Duration::minutes(11));
//! ```

use chrono::{DateTime, Duration, Utc};
use raffle_core::environment::Clock;
use std::sync::{Mutex, PoisonError};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Mutex, PoisonError, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use raffle_testing::mocks::FixedClock;
    /// use raffle_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Manually advanced clock for expiry and scheduling tests.
    ///
    /// Starts at a chosen instant and only moves when the test calls
    /// [`advance`](Self::advance), so reservation windows and sweep cutoffs
    /// can be crossed deterministically instead of sleeping.
    #[derive(Debug)]
    pub struct SteppingClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl SteppingClock {
        /// Create a stepping clock at the given instant
        #[must_use]
        pub const fn at(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward by `step`
        pub fn advance(&self, step: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += step;
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for common test fixtures.
pub mod builders {
    use chrono::{DateTime, Duration, Utc};
    use raffle_core::types::{Money, NewCompetition};

    /// Builder for [`NewCompetition`] fixtures with sensible defaults
    /// (5 tickets at 1.00, drawn a week out).
    #[derive(Debug, Clone)]
    pub struct CompetitionBuilder {
        name: String,
        max_tickets: u32,
        ticket_price: Money,
        draw_date: DateTime<Utc>,
    }

    impl CompetitionBuilder {
        /// Start from the defaults
        #[must_use]
        pub fn new() -> Self {
            Self {
                name: "Test competition".to_string(),
                max_tickets: 5,
                ticket_price: Money::from_minor_units(100),
                draw_date: Utc::now() + Duration::days(7),
            }
        }

        /// Set the display name
        #[must_use]
        pub fn name(mut self, name: impl Into<String>) -> Self {
            self.name = name.into();
            self
        }

        /// Set the pool capacity
        #[must_use]
        pub const fn max_tickets(mut self, max_tickets: u32) -> Self {
            self.max_tickets = max_tickets;
            self
        }

        /// Set the ticket price
        #[must_use]
        pub const fn ticket_price(mut self, price: Money) -> Self {
            self.ticket_price = price;
            self
        }

        /// Set the draw date
        #[must_use]
        pub const fn draw_date(mut self, draw_date: DateTime<Utc>) -> Self {
            self.draw_date = draw_date;
            self
        }

        /// Build the [`NewCompetition`]
        #[must_use]
        pub fn build(self) -> NewCompetition {
            NewCompetition {
                name: self.name,
                max_tickets: self.max_tickets,
                ticket_price: self.ticket_price,
                draw_date: self.draw_date,
            }
        }
    }

    impl Default for CompetitionBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Install a compact tracing subscriber for a test binary.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .compact()
        .try_init();
}

// Re-export commonly used items
pub use builders::CompetitionBuilder;
pub use mocks::{FixedClock, SteppingClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_frozen() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn stepping_clock_moves_only_on_advance() {
        let clock = SteppingClock::at(test_clock().now());
        let start = clock.now();
        assert_eq!(clock.now(), start);
        clock.advance(Duration::seconds(40));
        assert_eq!(clock.now(), start + Duration::seconds(40));
    }

    #[test]
    fn competition_builder_defaults() {
        let new = CompetitionBuilder::new()
            .name("Toaster")
            .max_tickets(10)
            .build();
        assert_eq!(new.name, "Toaster");
        assert_eq!(new.max_tickets, 10);
    }
}
