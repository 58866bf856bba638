//! Reservation lock manager.
//!
//! Short-lived mutual exclusion over a set of ticket numbers, serializing
//! conflicting reservation work before it reaches the store. Locks are keyed
//! per individual `(competition, ticket number)` pair rather than by the
//! literal set, so overlapping-but-different requests (`{1,2}` vs `{2,3}`)
//! conflict here too. A request takes all of its keys atomically inside one critical
//! section, in ascending number order, which rules out deadlock between
//! overlapping requests.
//!
//! The lock table is process-local state: its lifetime is the process, it
//! resets on restart, and it is not shared across instances. It exists to
//! reduce wasted retries; correctness always rests on the store's
//! conditional updates.
//!
//! Holds self-expire after a TTL so a crashed holder cannot wedge the pool.
//! Each hold carries a token, and a guard only removes entries still carrying
//! its own token: a guard whose hold lapsed and was re-acquired by someone
//! else must not release the new holder's lock.

use crate::config::LockConfig;
use metrics::counter;
use raffle_core::error::{Result, TicketError};
use raffle_core::types::{CompetitionId, TicketNumber};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LockKey {
    competition_id: CompetitionId,
    number: TicketNumber,
}

#[derive(Clone, Copy, Debug)]
struct Hold {
    token: u64,
    expires_at: Instant,
}

/// Process-local advisory lock table over ticket numbers.
///
/// Acquire with [`lock_tickets`](Self::lock_tickets); the returned guard
/// releases on every exit path, including panics and early returns, because
/// release happens in `Drop`.
pub struct ReservationLockManager {
    config: LockConfig,
    table: Mutex<HashMap<LockKey, Hold>>,
    next_token: AtomicU64,
}

impl ReservationLockManager {
    /// Create a lock manager with the given timing configuration.
    #[must_use]
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            table: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Acquire an exclusive hold over `numbers` within one competition.
    ///
    /// Disjoint sets proceed fully in parallel; a request overlapping a live
    /// hold polls every `poll_interval` until the hold clears or
    /// `acquire_timeout` elapses. No fairness is promised among waiters.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::LockTimeout`] if a conflicting hold does not
    /// clear within the bounded wait.
    pub async fn lock_tickets(
        self: &Arc<Self>,
        competition_id: CompetitionId,
        numbers: &[TicketNumber],
    ) -> Result<LockGuard> {
        let mut keys: Vec<LockKey> = numbers
            .iter()
            .map(|&number| LockKey {
                competition_id,
                number,
            })
            .collect();
        keys.sort_by_key(|k| k.number);
        keys.dedup();

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.config.acquire_timeout;

        loop {
            if self.try_acquire(&keys, token) {
                counter!("raffle_lock_acquired_total").increment(1);
                debug!(
                    competition_id = %competition_id,
                    tickets = keys.len(),
                    "Reservation lock acquired"
                );
                return Ok(LockGuard {
                    manager: Arc::clone(self),
                    keys,
                    token,
                });
            }

            if Instant::now() >= deadline {
                counter!("raffle_lock_timeouts_total").increment(1);
                warn!(
                    competition_id = %competition_id,
                    tickets = keys.len(),
                    "Timed out waiting for reservation lock"
                );
                return Err(TicketError::LockTimeout { competition_id });
            }

            counter!("raffle_lock_contention_polls_total").increment(1);
            sleep(self.config.poll_interval).await;
        }
    }

    /// Take every key or none, inside one critical section.
    ///
    /// A lapsed hold (TTL passed) counts as free and is overwritten.
    fn try_acquire(&self, keys: &[LockKey], token: u64) -> bool {
        let now = Instant::now();
        let mut table = self.lock_table();

        if keys
            .iter()
            .any(|key| table.get(key).is_some_and(|hold| hold.expires_at > now))
        {
            return false;
        }

        let expires_at = now + self.config.hold_ttl;
        for key in keys {
            table.insert(*key, Hold { token, expires_at });
        }
        true
    }

    fn release(&self, keys: &[LockKey], token: u64) {
        let mut table = self.lock_table();
        for key in keys {
            if table.get(key).is_some_and(|hold| hold.token == token) {
                table.remove(key);
            }
        }
    }

    /// Number of live (unexpired) holds, for observability and tests.
    #[must_use]
    pub fn live_holds(&self) -> usize {
        let now = Instant::now();
        self.lock_table()
            .values()
            .filter(|hold| hold.expires_at > now)
            .count()
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<LockKey, Hold>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII hold over a set of ticket numbers.
///
/// Dropping the guard releases every key that still carries this guard's
/// token, which covers success, validation failure, and timeout paths alike.
#[must_use = "dropping the guard releases the lock"]
pub struct LockGuard {
    manager: Arc<ReservationLockManager>,
    keys: Vec<LockKey>,
    token: u64,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.manager.release(&self.keys, self.token);
    }
}
