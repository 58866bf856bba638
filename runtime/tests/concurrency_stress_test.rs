//! Concurrency stress tests for last-ticket scenarios.
//!
//! These tests verify that under heavy concurrent load the engine hands out
//! each ticket exactly once: overlapping reservation requests never both
//! succeed, and the pool's counts stay conserved throughout.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use futures::future::join_all;
use raffle_core::environment::SystemClock;
use raffle_core::{
    HolderId, InMemoryTicketPool, TicketError, TicketNumber, TicketStatus,
};
use raffle_runtime::{EngineConfig, LockConfig, TicketEngine};
use raffle_testing::CompetitionBuilder;
use std::sync::Arc;
use std::time::Duration;

fn stress_engine() -> Arc<TicketEngine> {
    let config = EngineConfig::new().with_lock(
        LockConfig::new()
            .with_poll_interval(Duration::from_millis(2))
            .with_acquire_timeout(Duration::from_secs(5)),
    );
    Arc::new(TicketEngine::new(
        Arc::new(InMemoryTicketPool::new()),
        Arc::new(SystemClock),
        config,
    ))
}

/// Test: 100 concurrent reservation attempts for 1 ticket.
///
/// Verifies that:
/// - Exactly 1 reservation succeeds
/// - Exactly 99 fail with `TicketUnavailable` (or time out waiting)
/// - The pool still sums to capacity afterwards
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_ticket_100_concurrent_requests() {
    let engine = stress_engine();
    let competition = engine
        .create_competition(CompetitionBuilder::new().max_tickets(1).build())
        .await
        .unwrap();
    let competition = engine.open_competition(competition.id).await.unwrap();

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let competition_id = competition.id;
            tokio::spawn(async move {
                let holder = HolderId::new(format!("session-{i}"));
                engine
                    .reserve(competition_id, &[TicketNumber::new(1)], &holder, None)
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let unavailable = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(TicketError::TicketUnavailable { .. } | TicketError::LockTimeout { .. })
            )
        })
        .count();

    assert_eq!(successes, 1, "exactly one request may win the last ticket");
    assert_eq!(unavailable, 99);

    let tickets = engine
        .store()
        .tickets(competition.id, None)
        .await
        .unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].status, TicketStatus::Reserved);
}

/// Test: concurrent overlapping multi-ticket requests.
///
/// 20 tasks race over a 10-ticket pool, each asking for a random-ish window
/// of 3 consecutive numbers. Afterwards every reserved ticket must have
/// exactly one holder and the pool must still sum to capacity.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_windows_never_double_allocate() {
    let engine = stress_engine();
    let competition = engine
        .create_competition(CompetitionBuilder::new().max_tickets(10).build())
        .await
        .unwrap();
    let competition = engine.open_competition(competition.id).await.unwrap();

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let competition_id = competition.id;
            tokio::spawn(async move {
                let start = (i % 8) + 1; // windows [1..3] through [8..10]
                let numbers: Vec<TicketNumber> =
                    (start..start + 3).map(TicketNumber::new).collect();
                let holder = HolderId::new(format!("session-{i}"));
                (
                    holder.clone(),
                    engine.reserve(competition_id, &numbers, &holder, None).await,
                )
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    // Collect who won which numbers; no number may appear twice.
    let mut claimed: Vec<(u32, HolderId)> = Vec::new();
    for (holder, result) in results {
        if let Ok(reservation) = result {
            for number in reservation.ticket_numbers {
                assert!(
                    !claimed.iter().any(|(n, _)| *n == number.value()),
                    "ticket {number} was handed to two holders"
                );
                claimed.push((number.value(), holder.clone()));
            }
        }
    }

    // The store agrees with the winners' view.
    let tickets = engine
        .store()
        .tickets(competition.id, None)
        .await
        .unwrap();
    assert_eq!(tickets.len(), 10);
    for ticket in tickets {
        match ticket.status {
            TicketStatus::Reserved => {
                let holder = ticket.holder.expect("reserved ticket has a holder");
                assert!(
                    claimed
                        .iter()
                        .any(|(n, h)| *n == ticket.number.value() && *h == holder),
                    "store holder must match the reservation winner"
                );
            }
            TicketStatus::Available => {
                assert!(ticket.holder.is_none());
            }
            TicketStatus::Purchased => unreachable!("nothing was purchased"),
        }
    }
}

/// Test: racing purchase and release on the same reservation.
///
/// Whichever transition lands first, the loser observes a clean precondition
/// failure and the ticket ends in exactly one of the two legal states.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_purchase_and_release_settle_cleanly() {
    for _ in 0..25 {
        let engine = stress_engine();
        let competition = engine
            .create_competition(CompetitionBuilder::new().max_tickets(1).build())
            .await
            .unwrap();
        let competition = engine.open_competition(competition.id).await.unwrap();

        let buyer = raffle_core::UserId::new();
        engine
            .reserve(
                competition.id,
                &[TicketNumber::new(1)],
                &buyer.holder_id(),
                None,
            )
            .await
            .unwrap();
        let ticket = engine
            .store()
            .ticket_by_number(competition.id, TicketNumber::new(1))
            .await
            .unwrap();

        let purchase = {
            let engine = Arc::clone(&engine);
            let ticket_id = ticket.id;
            tokio::spawn(async move { engine.purchase(&[ticket_id], buyer).await.map(|_| ()) })
        };
        let release = {
            let engine = Arc::clone(&engine);
            let competition_id = competition.id;
            tokio::spawn(async move {
                engine
                    .release(competition_id, &[TicketNumber::new(1)], &buyer.holder_id())
                    .await
                    .map(|_| ())
            })
        };

        let (purchase, release) = tokio::join!(purchase, release);
        purchase.unwrap().and(release.unwrap()).ok();

        let ticket = engine
            .store()
            .ticket_by_number(competition.id, TicketNumber::new(1))
            .await
            .unwrap();
        let competition = engine.store().competition(competition.id).await.unwrap();
        match ticket.status {
            // Purchase won; the sale is terminal and counted.
            TicketStatus::Purchased => assert_eq!(competition.tickets_sold, 1),
            // Release won; purchase failed cleanly and sold nothing.
            TicketStatus::Available => assert_eq!(competition.tickets_sold, 0),
            TicketStatus::Reserved => unreachable!("one of the two must have applied"),
        }
    }
}
