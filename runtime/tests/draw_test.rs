//! Draw engine and scanner tests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::Duration as ChronoDuration;
use raffle_core::environment::Clock;
use raffle_core::{
    Competition, CompetitionStatus, EntryStatus, FulfillmentStatus, InMemoryTicketPool,
    TicketError, TicketNumber, TicketPoolStore, UserId,
};
use raffle_runtime::{DrawEngine, EngineConfig, TicketEngine};
use raffle_testing::{CompetitionBuilder, SteppingClock, test_clock};
use std::sync::Arc;

struct Fixture {
    engine: TicketEngine,
    draw: DrawEngine,
    clock: Arc<SteppingClock>,
}

fn fixture() -> Fixture {
    let store: Arc<dyn TicketPoolStore> = Arc::new(InMemoryTicketPool::new());
    let clock = Arc::new(SteppingClock::at(test_clock().now()));
    let engine = TicketEngine::new(
        Arc::clone(&store),
        Arc::clone(&clock) as Arc<dyn Clock>,
        EngineConfig::default(),
    );
    let draw = DrawEngine::new(store, Arc::clone(&clock) as Arc<dyn Clock>);
    Fixture {
        engine,
        draw,
        clock,
    }
}

async fn live_competition(f: &Fixture, max_tickets: u32) -> Competition {
    let competition = f
        .engine
        .create_competition(
            CompetitionBuilder::new()
                .max_tickets(max_tickets)
                .draw_date(f.clock.now() + ChronoDuration::days(7))
                .build(),
        )
        .await
        .unwrap();
    f.engine.open_competition(competition.id).await.unwrap()
}

/// Buy one ticket per user so each user owns exactly one entry.
async fn sell_out(f: &Fixture, competition: &Competition) -> Vec<UserId> {
    let mut buyers = Vec::new();
    for number in 1..=competition.max_tickets {
        let buyer = UserId::new();
        f.engine
            .reserve(
                competition.id,
                &[TicketNumber::new(number)],
                &buyer.holder_id(),
                None,
            )
            .await
            .unwrap();
        let ticket = f
            .engine
            .store()
            .ticket_by_number(competition.id, TicketNumber::new(number))
            .await
            .unwrap();
        f.engine.purchase(&[ticket.id], buyer).await.unwrap();
        buyers.push(buyer);
    }
    buyers
}

#[tokio::test]
async fn draw_picks_one_winner_and_is_idempotent() {
    let f = fixture();
    let competition = live_competition(&f, 5).await;
    let buyers = sell_out(&f, &competition).await;

    // Sold out, so the draw is due before the draw date.
    let outcome = f.draw.perform_draw(competition.id).await.unwrap();
    assert!(buyers.contains(&outcome.winner));
    assert_eq!(outcome.winning_entry.user_id, outcome.winner);
    assert_eq!(outcome.winning_entry.status, EntryStatus::Won);
    assert_eq!(outcome.win.fulfillment, FulfillmentStatus::Pending);
    assert!(
        outcome
            .winning_entry
            .ticket_ids
            .contains(&outcome.winning_ticket.id)
    );

    let store = f.engine.store();
    let after = store.competition(competition.id).await.unwrap();
    assert_eq!(after.status, CompetitionStatus::Completed);
    assert_eq!(after.winner_user_id, Some(outcome.winner));

    // Exactly one entry won; the other four lost.
    let entries = store.entries(competition.id).await.unwrap();
    let won = entries
        .iter()
        .filter(|e| e.status == EntryStatus::Won)
        .count();
    let lost = entries
        .iter()
        .filter(|e| e.status == EntryStatus::Lost)
        .count();
    assert_eq!((won, lost), (1, 4));

    // A second draw changes nothing.
    let err = f.draw.perform_draw(competition.id).await.unwrap_err();
    assert_eq!(
        err,
        TicketError::AlreadyDrawn {
            competition_id: competition.id
        }
    );
    let unchanged = store.competition(competition.id).await.unwrap();
    assert_eq!(unchanged.winner_user_id, Some(outcome.winner));
}

#[tokio::test]
async fn draw_refuses_before_the_trigger_condition() {
    let f = fixture();
    let competition = live_competition(&f, 5).await;

    // One sale, draw date a week out: not due.
    let buyer = UserId::new();
    f.engine
        .reserve(
            competition.id,
            &[TicketNumber::new(1)],
            &buyer.holder_id(),
            None,
        )
        .await
        .unwrap();
    let ticket = f
        .engine
        .store()
        .ticket_by_number(competition.id, TicketNumber::new(1))
        .await
        .unwrap();
    f.engine.purchase(&[ticket.id], buyer).await.unwrap();

    let err = f.draw.perform_draw(competition.id).await.unwrap_err();
    assert_eq!(
        err,
        TicketError::NotYetDue {
            competition_id: competition.id
        }
    );

    // Once the draw date passes it becomes due.
    f.clock.advance(ChronoDuration::days(8));
    f.draw.perform_draw(competition.id).await.unwrap();
}

#[tokio::test]
async fn draw_with_no_sales_reports_no_eligible_tickets() {
    let f = fixture();
    let competition = live_competition(&f, 5).await;

    f.clock.advance(ChronoDuration::days(8));
    let err = f.draw.perform_draw(competition.id).await.unwrap_err();
    assert_eq!(
        err,
        TicketError::NoEligibleTickets {
            competition_id: competition.id
        }
    );
    // The competition stays live for the operator to deal with.
    let after = f
        .engine
        .store()
        .competition(competition.id)
        .await
        .unwrap();
    assert_eq!(after.status, CompetitionStatus::Live);
}

#[tokio::test]
async fn winning_entry_spans_all_its_tickets() {
    let f = fixture();
    let competition = live_competition(&f, 3).await;
    let buyer = UserId::new();

    // One buyer purchases the whole pool in a single transaction.
    f.engine
        .reserve(
            competition.id,
            &[
                TicketNumber::new(1),
                TicketNumber::new(2),
                TicketNumber::new(3),
            ],
            &buyer.holder_id(),
            None,
        )
        .await
        .unwrap();
    let store = f.engine.store();
    let mut ids = Vec::new();
    for n in 1..=3 {
        ids.push(
            store
                .ticket_by_number(competition.id, TicketNumber::new(n))
                .await
                .unwrap()
                .id,
        );
    }
    let receipt = f.engine.purchase(&ids, buyer).await.unwrap();
    assert_eq!(receipt.entry.ticket_ids.len(), 3);

    let outcome = f.draw.perform_draw(competition.id).await.unwrap();
    assert_eq!(outcome.winner, buyer);
    assert_eq!(outcome.winning_entry.id, receipt.entry.id);
}

#[tokio::test]
async fn scanner_processes_each_due_competition_independently() {
    let f = fixture();

    // Competition A: sold out, drawable.
    let a = live_competition(&f, 2).await;
    sell_out(&f, &a).await;

    // Competition B: due by date but empty, so skipped rather than failed.
    let b = live_competition(&f, 2).await;

    // Competition C: not due at all, so untouched.
    let c = f
        .engine
        .create_competition(
            CompetitionBuilder::new()
                .max_tickets(2)
                .draw_date(f.clock.now() + ChronoDuration::days(30))
                .build(),
        )
        .await
        .unwrap();
    f.engine.open_competition(c.id).await.unwrap();

    f.clock.advance(ChronoDuration::days(8));
    let report = f.draw.scan_once().await.unwrap();
    assert_eq!(report.drawn, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    let store = f.engine.store();
    assert_eq!(
        store.competition(a.id).await.unwrap().status,
        CompetitionStatus::Completed
    );
    assert_eq!(
        store.competition(b.id).await.unwrap().status,
        CompetitionStatus::Live
    );
    assert_eq!(
        store.competition(c.id).await.unwrap().status,
        CompetitionStatus::Live
    );

    // A second pass finds nothing left to draw.
    let report = f.draw.scan_once().await.unwrap();
    assert_eq!(report.drawn, 0);
}

#[tokio::test]
async fn cancelled_competitions_are_never_drawn_and_drawn_ones_never_cancelled() {
    let f = fixture();

    // Cancelled before its date: drops out of the due scan entirely.
    let cancelled = live_competition(&f, 2).await;
    f.engine.cancel_competition(cancelled.id).await.unwrap();
    f.clock.advance(ChronoDuration::days(8));
    let report = f.draw.scan_once().await.unwrap();
    assert_eq!(report.drawn + report.skipped + report.failed, 0);

    // Once drawn, the winner record blocks cancellation.
    let drawn = live_competition(&f, 2).await;
    sell_out(&f, &drawn).await;
    f.draw.perform_draw(drawn.id).await.unwrap();
    let err = f.engine.cancel_competition(drawn.id).await.unwrap_err();
    assert_eq!(
        err,
        TicketError::AlreadyDrawn {
            competition_id: drawn.id
        }
    );
}

#[tokio::test]
async fn win_fulfillment_advances_for_downstream_handling() {
    let f = fixture();
    let competition = live_competition(&f, 2).await;
    sell_out(&f, &competition).await;

    let outcome = f.draw.perform_draw(competition.id).await.unwrap();
    let store = f.engine.store();
    let claimed = store
        .update_fulfillment(outcome.win.id, FulfillmentStatus::Claimed)
        .await
        .unwrap();
    assert_eq!(claimed.fulfillment, FulfillmentStatus::Claimed);
    let delivered = store
        .update_fulfillment(outcome.win.id, FulfillmentStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(delivered.fulfillment, FulfillmentStatus::Delivered);
}
