//! Expiry sweeper tests with a manually advanced clock.
//!
//! The stepping clock lets the tests cross reservation deadlines without
//! sleeping, so the window/expiry contract is exercised deterministically.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::Duration as ChronoDuration;
use raffle_core::environment::Clock;
use raffle_core::{
    Competition, HolderId, InMemoryTicketPool, TicketNumber, TicketPoolStore, TicketStatus, UserId,
};
use raffle_runtime::{EngineConfig, ReservationSweeper, TicketEngine};
use raffle_testing::{CompetitionBuilder, SteppingClock, test_clock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

struct Fixture {
    engine: TicketEngine,
    sweeper: ReservationSweeper,
    clock: Arc<SteppingClock>,
}

fn fixture() -> Fixture {
    raffle_testing::init_test_tracing();
    let store: Arc<dyn TicketPoolStore> = Arc::new(InMemoryTicketPool::new());
    let clock = Arc::new(SteppingClock::at(test_clock().now()));
    let (_, shutdown_rx) = broadcast::channel(1);
    let engine = TicketEngine::new(
        Arc::clone(&store),
        Arc::clone(&clock) as Arc<dyn Clock>,
        EngineConfig::default(),
    );
    let sweeper = ReservationSweeper::new(
        store,
        Arc::clone(&clock) as Arc<dyn Clock>,
        Duration::from_secs(300),
        shutdown_rx,
    );
    Fixture {
        engine,
        sweeper,
        clock,
    }
}

async fn live_competition(engine: &TicketEngine) -> Competition {
    let competition = engine
        .create_competition(CompetitionBuilder::new().max_tickets(5).build())
        .await
        .unwrap();
    engine.open_competition(competition.id).await.unwrap()
}

#[tokio::test]
async fn sweep_reverts_only_after_the_window_elapses() {
    let f = fixture();
    let competition = live_competition(&f.engine).await;
    let holder = HolderId::new("session-a");

    // ~36 second window on ticket 4.
    let reservation = f
        .engine
        .reserve(
            competition.id,
            &[TicketNumber::new(4)],
            &holder,
            Some(ChronoDuration::seconds(36)),
        )
        .await
        .unwrap();

    // A sweep before expiry must not touch the hold.
    f.clock.advance(ChronoDuration::seconds(20));
    let report = f.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.swept, 0);
    let ticket = f
        .engine
        .store()
        .ticket_by_number(competition.id, TicketNumber::new(4))
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Reserved);
    assert_eq!(ticket.reserved_until, Some(reservation.expires_at));

    // 40 seconds in, the hold has lapsed and is reclaimed.
    f.clock.advance(ChronoDuration::seconds(20));
    let report = f.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.swept, 1);

    // A different holder can now take the ticket.
    f.engine
        .reserve(
            competition.id,
            &[TicketNumber::new(4)],
            &HolderId::new("session-b"),
            None,
        )
        .await
        .expect("ticket 4 reclaimed and free");
}

#[tokio::test]
async fn ten_minute_window_survives_early_sweeps() {
    let f = fixture();
    let competition = live_competition(&f.engine).await;
    let holder = HolderId::new("session-a");

    let reservation = f
        .engine
        .reserve(competition.id, &[TicketNumber::new(1)], &holder, None)
        .await
        .unwrap();
    assert_eq!(
        reservation.expires_at,
        f.clock.now() + ChronoDuration::minutes(10)
    );

    // Two sweep passes inside the window are both no-ops.
    f.clock.advance(ChronoDuration::minutes(5));
    assert_eq!(f.sweeper.sweep_once().await.unwrap().swept, 0);
    f.clock.advance(ChronoDuration::minutes(4));
    assert_eq!(f.sweeper.sweep_once().await.unwrap().swept, 0);

    // At the deadline the hold is reclaimable (expiry is inclusive).
    f.clock.advance(ChronoDuration::minutes(1));
    assert_eq!(f.sweeper.sweep_once().await.unwrap().swept, 1);
}

#[tokio::test]
async fn sweep_never_reverts_a_purchase_that_won_the_race() {
    let f = fixture();
    let competition = live_competition(&f.engine).await;
    let buyer = UserId::new();

    f.engine
        .reserve(
            competition.id,
            &[TicketNumber::new(2)],
            &buyer.holder_id(),
            Some(ChronoDuration::seconds(30)),
        )
        .await
        .unwrap();

    // The hold lapses... but the purchase lands before the sweeper runs,
    // exactly the race the guarded transition exists for.
    f.clock.advance(ChronoDuration::seconds(60));
    let ticket = f
        .engine
        .store()
        .ticket_by_number(competition.id, TicketNumber::new(2))
        .await
        .unwrap();
    f.engine.purchase(&[ticket.id], buyer).await.unwrap();

    let report = f.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.swept, 0);

    let ticket = f
        .engine
        .store()
        .ticket_by_number(competition.id, TicketNumber::new(2))
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Purchased);
}

#[tokio::test]
async fn sweep_reclaims_across_competitions_in_one_pass() {
    let f = fixture();
    let first = live_competition(&f.engine).await;
    let second = live_competition(&f.engine).await;
    let holder = HolderId::new("session-a");

    f.engine
        .reserve(
            first.id,
            &[TicketNumber::new(1), TicketNumber::new(2)],
            &holder,
            Some(ChronoDuration::seconds(10)),
        )
        .await
        .unwrap();
    f.engine
        .reserve(
            second.id,
            &[TicketNumber::new(5)],
            &holder,
            Some(ChronoDuration::seconds(10)),
        )
        .await
        .unwrap();

    f.clock.advance(ChronoDuration::seconds(11));
    let report = f.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.swept, 3);
    assert_eq!(report.skipped, 0);

    assert_eq!(f.engine.list_available(first.id).await.unwrap().len(), 5);
    assert_eq!(f.engine.list_available(second.id).await.unwrap().len(), 5);
}
