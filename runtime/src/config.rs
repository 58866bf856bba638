//! Engine configuration.
//!
//! Timing knobs for holds, locking, sweeping, and draw scanning.
//! Configuration values should be provided by the application, not
//! hardcoded; the defaults match the production deployment.

use chrono::Duration as ChronoDuration;
use std::time::Duration;

/// Reservation lock manager configuration.
#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    /// How often a blocked request re-checks a contended hold.
    ///
    /// Default: 100ms
    pub poll_interval: Duration,

    /// Bounded wait before a contended acquisition fails with `LockTimeout`.
    ///
    /// Default: 10 seconds
    pub acquire_timeout: Duration,

    /// Self-expiry for held locks, so a crashed holder cannot wedge the
    /// pool indefinitely.
    ///
    /// Default: 5 seconds
    pub hold_ttl: Duration,
}

impl LockConfig {
    /// Create the default lock configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            acquire_timeout: Duration::from_secs(10),
            hold_ttl: Duration::from_secs(5),
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the bounded acquisition wait.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the hold TTL.
    #[must_use]
    pub const fn with_hold_ttl(mut self, ttl: Duration) -> Self {
        self.hold_ttl = ttl;
        self
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticket engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Default hold window applied when a caller does not pass one.
    ///
    /// Default: 10 minutes
    pub reservation_window: ChronoDuration,

    /// Lock manager timing.
    pub lock: LockConfig,

    /// Interval between expiry sweeps.
    ///
    /// Default: 5 minutes
    pub sweep_interval: Duration,

    /// Interval between draw scans over live competitions.
    ///
    /// Default: 1 hour
    pub draw_scan_interval: Duration,
}

impl EngineConfig {
    /// Create the default engine configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reservation_window: ChronoDuration::minutes(10),
            lock: LockConfig::new(),
            sweep_interval: Duration::from_secs(300),
            draw_scan_interval: Duration::from_secs(3600),
        }
    }

    /// Set the default reservation window.
    #[must_use]
    pub const fn with_reservation_window(mut self, window: ChronoDuration) -> Self {
        self.reservation_window = window;
        self
    }

    /// Set the lock manager timing.
    #[must_use]
    pub const fn with_lock(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    /// Set the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the draw scan interval.
    #[must_use]
    pub const fn with_draw_scan_interval(mut self, interval: Duration) -> Self {
        self.draw_scan_interval = interval;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_timings() {
        let config = EngineConfig::default();
        assert_eq!(config.reservation_window, ChronoDuration::minutes(10));
        assert_eq!(config.lock.poll_interval, Duration::from_millis(100));
        assert_eq!(config.lock.acquire_timeout, Duration::from_secs(10));
        assert_eq!(config.lock.hold_ttl, Duration::from_secs(5));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.draw_scan_interval, Duration::from_secs(3600));
    }

    #[test]
    fn builders_override_fields() {
        let config = EngineConfig::new()
            .with_reservation_window(ChronoDuration::seconds(36))
            .with_lock(LockConfig::new().with_acquire_timeout(Duration::from_millis(250)));
        assert_eq!(config.reservation_window, ChronoDuration::seconds(36));
        assert_eq!(config.lock.acquire_timeout, Duration::from_millis(250));
    }
}
