//! End-to-end demo: wire the engine, sweeper, and draw scanner together
//! over the in-memory store, run a tiny competition to completion, and
//! print the outcome.
//!
//! Run with: `cargo run --example end_to_end`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration as ChronoDuration, Utc};
use raffle_core::environment::{Clock, SystemClock};
use raffle_core::types::Money;
use raffle_core::{HolderId, InMemoryTicketPool, NewCompetition, TicketNumber, TicketPoolStore, UserId};
use raffle_runtime::metrics::MetricsServer;
use raffle_runtime::{
    DrawEngine, DrawScanner, EngineConfig, ReservationSweeper, TicketEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut metrics_server = MetricsServer::new("127.0.0.1:9090".parse()?);
    metrics_server.start()?;

    let store: Arc<dyn TicketPoolStore> = Arc::new(InMemoryTicketPool::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let config = EngineConfig::default()
        .with_sweep_interval(Duration::from_millis(500))
        .with_draw_scan_interval(Duration::from_millis(500));

    let engine = TicketEngine::new(Arc::clone(&store), Arc::clone(&clock), config);
    let draw_engine = Arc::new(DrawEngine::new(Arc::clone(&store), Arc::clone(&clock)));

    // Background timers with coordinated shutdown.
    let (shutdown_tx, _) = broadcast::channel(1);
    let sweeper = ReservationSweeper::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        config.sweep_interval,
        shutdown_tx.subscribe(),
    )
    .spawn();
    let scanner = DrawScanner::new(
        Arc::clone(&draw_engine),
        config.draw_scan_interval,
        shutdown_tx.subscribe(),
    )
    .spawn();

    // A three-ticket competition, drawn as soon as it sells out.
    let competition = engine
        .create_competition(NewCompetition {
            name: "Win a toaster".to_string(),
            max_tickets: 3,
            ticket_price: Money::from_minor_units(250),
            draw_date: Utc::now() + ChronoDuration::days(7),
        })
        .await?;
    let competition = engine.open_competition(competition.id).await?;

    info!(available = ?engine.list_available(competition.id).await?, "Pool open");

    for number in 1..=3u32 {
        let buyer = UserId::new();
        engine
            .reserve(
                competition.id,
                &[TicketNumber::new(number)],
                &HolderId::from(&buyer),
                None,
            )
            .await?;
        let ticket = store
            .ticket_by_number(competition.id, TicketNumber::new(number))
            .await?;
        let receipt = engine.purchase(&[ticket.id], buyer).await?;
        info!(
            ticket = %number,
            entry = %receipt.entry.id,
            "Ticket sold"
        );
    }

    // Sold out: the scanner's next pass will draw it.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let finished = store.competition(competition.id).await?;
    info!(
        status = %finished.status,
        winner = ?finished.winner_user_id,
        "Competition finished"
    );

    if let Some(snapshot) = metrics_server.render() {
        info!(bytes = snapshot.len(), "Metrics snapshot served at http://127.0.0.1:9090/metrics");
    }

    let _ = shutdown_tx.send(());
    let _ = tokio::join!(sweeper, scanner);
    Ok(())
}
