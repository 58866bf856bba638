//! `TicketPoolStore` over a sqlx `PgPool`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use raffle_core::error::{Result, TicketError};
use raffle_core::store::TicketPoolStore;
use raffle_core::transitions::{ReleaseAuthority, TicketTransition};
use raffle_core::types::{
    Competition, CompetitionId, CompetitionStatus, Entry, EntryId, EntryStatus, FulfillmentStatus,
    HolderId, NewCompetition, Ticket, TicketId, TicketNumber, TicketStatus, UserId, Win, WinId,
};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

/// DDL for the ticket pool schema, applied by [`PostgresTicketPool::ensure_schema`].
const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS competitions (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        max_tickets INTEGER NOT NULL CHECK (max_tickets > 0),
        ticket_price_minor BIGINT NOT NULL,
        draw_date TIMESTAMPTZ NOT NULL,
        tickets_sold INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'draft',
        winner_user_id UUID,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS tickets (
        id UUID PRIMARY KEY,
        competition_id UUID NOT NULL REFERENCES competitions(id),
        ticket_number INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'available',
        holder TEXT,
        reserved_until TIMESTAMPTZ,
        purchased_at TIMESTAMPTZ,
        UNIQUE (competition_id, ticket_number)
    )
    ",
    r"CREATE INDEX IF NOT EXISTS idx_tickets_expiry ON tickets(status, reserved_until)",
    r"
    CREATE TABLE IF NOT EXISTS entries (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        competition_id UUID NOT NULL REFERENCES competitions(id),
        ticket_ids UUID[] NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL
    )
    ",
    r"CREATE INDEX IF NOT EXISTS idx_entries_competition ON entries(competition_id, created_at)",
    r"
    CREATE TABLE IF NOT EXISTS wins (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        competition_id UUID NOT NULL REFERENCES competitions(id),
        entry_id UUID NOT NULL REFERENCES entries(id),
        ticket_id UUID NOT NULL REFERENCES tickets(id),
        fulfillment TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMPTZ NOT NULL
    )
    ",
];

/// `PostgreSQL`-backed ticket pool store.
///
/// The guarded transitions compile to conditional updates
/// (`WHERE status = …` and, where the precondition cares, `AND holder = …`),
/// so the database itself arbitrates races between processes.
pub struct PostgresTicketPool {
    pool: PgPool,
}

impl PostgresTicketPool {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database URL.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the connection fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await.map_err(storage)?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if any DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage)?;
        }
        info!("Ticket pool schema ensured");
        Ok(())
    }

    /// The underlying pool, for callers that need raw access in tests.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn competition_exists(&self, id: CompetitionId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM competitions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.is_some())
    }

    /// Build the precise error for a conditional update that matched no row.
    async fn transition_mismatch(
        &self,
        ticket_id: TicketId,
        transition: &TicketTransition,
    ) -> TicketError {
        let current = sqlx::query("SELECT status, holder FROM tickets WHERE id = $1")
            .bind(ticket_id.as_uuid())
            .fetch_optional(&self.pool)
            .await;
        match current {
            Ok(None) => TicketError::TicketNotFound { ticket_id },
            Ok(Some(row)) => {
                let status = row
                    .try_get::<String, _>("status")
                    .ok()
                    .and_then(|s| TicketStatus::parse(&s).ok());
                match (status, transition) {
                    // Reserved by somebody else is a holder mismatch, not a
                    // status mismatch.
                    (Some(TicketStatus::Reserved), TicketTransition::Purchase { .. }) => {
                        TicketError::TicketNotReserved { ticket_id }
                    }
                    (Some(current), _) => TicketError::InvalidTransition {
                        current,
                        required: transition.required_status(),
                    },
                    (None, _) => TicketError::Storage(format!(
                        "unreadable status on ticket {ticket_id}"
                    )),
                }
            }
            Err(e) => storage(e),
        }
    }

    /// Build the precise error for a purchase update that matched no row:
    /// missing ticket, wrong competition, or not reserved by the purchaser.
    async fn purchase_mismatch(
        &self,
        competition_id: CompetitionId,
        ticket_id: TicketId,
    ) -> TicketError {
        let row = sqlx::query("SELECT competition_id FROM tickets WHERE id = $1")
            .bind(ticket_id.as_uuid())
            .fetch_optional(&self.pool)
            .await;
        match row {
            Ok(None) => TicketError::TicketNotFound { ticket_id },
            Ok(Some(row)) => match row.try_get::<Uuid, _>("competition_id") {
                Ok(owner) if owner != *competition_id.as_uuid() => {
                    TicketError::MixedCompetitions
                }
                Ok(_) => TicketError::TicketNotReserved { ticket_id },
                Err(e) => TicketError::Storage(format!("column competition_id: {e}")),
            },
            Err(e) => storage(e),
        }
    }
}

#[async_trait]
impl TicketPoolStore for PostgresTicketPool {
    async fn create_competition(&self, new: NewCompetition) -> Result<Competition> {
        // Mirrors the schema's CHECK (max_tickets > 0).
        if new.max_tickets == 0 {
            return Err(TicketError::ZeroCapacity);
        }
        let id = CompetitionId::new();
        let created_at = Utc::now();
        let max_tickets = to_db_count(new.max_tickets)?;

        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query(
            r"
            INSERT INTO competitions
                (id, name, max_tickets, ticket_price_minor, draw_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 'draft', $6)
            ",
        )
        .bind(id.as_uuid())
        .bind(&new.name)
        .bind(max_tickets)
        .bind(new.ticket_price.minor_units())
        .bind(new.draw_date)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        // Bulk-create the whole pool in one statement.
        sqlx::query(
            r"
            INSERT INTO tickets (id, competition_id, ticket_number, status)
            SELECT gen_random_uuid(), $1, gs, 'available'
            FROM generate_series(1, $2) AS gs
            ",
        )
        .bind(id.as_uuid())
        .bind(max_tickets)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
        tx.commit().await.map_err(storage)?;

        info!(competition_id = %id, max_tickets = new.max_tickets, "Competition pool created");
        Ok(Competition {
            id,
            name: new.name,
            max_tickets: new.max_tickets,
            ticket_price: new.ticket_price,
            draw_date: new.draw_date,
            tickets_sold: 0,
            status: CompetitionStatus::Draft,
            winner_user_id: None,
            created_at,
        })
    }

    async fn competition(&self, id: CompetitionId) -> Result<Competition> {
        let row = sqlx::query("SELECT * FROM competitions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or(TicketError::CompetitionNotFound { competition_id: id })?;
        competition_from_row(&row)
    }

    async fn open_competition(&self, id: CompetitionId) -> Result<Competition> {
        let row = sqlx::query(
            "UPDATE competitions SET status = 'live' WHERE id = $1 AND status = 'draft' RETURNING *",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => competition_from_row(&row),
            None => {
                let current = self.competition(id).await?;
                Err(TicketError::CompetitionClosed {
                    status: current.status,
                })
            }
        }
    }

    async fn list_competitions(&self) -> Result<Vec<Competition>> {
        let rows = sqlx::query("SELECT * FROM competitions ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter().map(competition_from_row).collect()
    }

    async fn cancel_competition(&self, id: CompetitionId) -> Result<Competition> {
        let row = sqlx::query(
            r"
            UPDATE competitions SET status = 'cancelled'
            WHERE id = $1 AND status IN ('draft', 'live') AND winner_user_id IS NULL
            RETURNING *
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => competition_from_row(&row),
            None => {
                let current = self.competition(id).await?;
                if current.winner_user_id.is_some() {
                    Err(TicketError::AlreadyDrawn { competition_id: id })
                } else {
                    Err(TicketError::CompetitionClosed {
                        status: current.status,
                    })
                }
            }
        }
    }

    async fn competitions_due_for_draw(&self, now: DateTime<Utc>) -> Result<Vec<Competition>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM competitions
            WHERE status = 'live'
              AND winner_user_id IS NULL
              AND (draw_date <= $1 OR tickets_sold >= max_tickets)
            ORDER BY draw_date
            ",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(competition_from_row).collect()
    }

    async fn tickets(
        &self,
        competition_id: CompetitionId,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>> {
        if !self.competition_exists(competition_id).await? {
            return Err(TicketError::CompetitionNotFound { competition_id });
        }
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r"
                    SELECT * FROM tickets
                    WHERE competition_id = $1 AND status = $2
                    ORDER BY ticket_number
                    ",
                )
                .bind(competition_id.as_uuid())
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM tickets WHERE competition_id = $1 ORDER BY ticket_number",
                )
                .bind(competition_id.as_uuid())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(storage)?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn ticket_by_number(
        &self,
        competition_id: CompetitionId,
        number: TicketNumber,
    ) -> Result<Ticket> {
        let competition = self.competition(competition_id).await?;
        if !competition.contains_number(number) {
            return Err(TicketError::OutOfRange {
                number,
                max_tickets: competition.max_tickets,
            });
        }
        let row = sqlx::query(
            "SELECT * FROM tickets WHERE competition_id = $1 AND ticket_number = $2",
        )
        .bind(competition_id.as_uuid())
        .bind(to_db_count(number.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| {
            TicketError::Storage(format!("pool invariant breach: no ticket at number {number}"))
        })?;
        ticket_from_row(&row)
    }

    async fn tickets_by_ids(&self, ids: &[TicketId]) -> Result<Vec<Ticket>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query("SELECT * FROM tickets WHERE id = ANY($1)")
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        let fetched: Vec<Ticket> = rows.iter().map(ticket_from_row).collect::<Result<_>>()?;

        // Preserve the caller's order and surface the first missing id.
        ids.iter()
            .map(|id| {
                fetched
                    .iter()
                    .find(|t| t.id == *id)
                    .cloned()
                    .ok_or(TicketError::TicketNotFound { ticket_id: *id })
            })
            .collect()
    }

    async fn apply_transition(
        &self,
        ticket_id: TicketId,
        transition: &TicketTransition,
    ) -> Result<Ticket> {
        let row = match transition {
            TicketTransition::Reserve {
                holder,
                reserved_until,
            } => {
                sqlx::query(
                    r"
                    UPDATE tickets
                    SET status = 'reserved', holder = $2, reserved_until = $3
                    WHERE id = $1 AND status = 'available'
                    RETURNING *
                    ",
                )
                .bind(ticket_id.as_uuid())
                .bind(holder.as_str())
                .bind(reserved_until)
                .fetch_optional(&self.pool)
                .await
            }
            TicketTransition::Purchase {
                purchaser,
                purchased_at,
            } => {
                sqlx::query(
                    r"
                    UPDATE tickets
                    SET status = 'purchased', reserved_until = NULL, purchased_at = $3
                    WHERE id = $1 AND status = 'reserved' AND holder = $2
                    RETURNING *
                    ",
                )
                .bind(ticket_id.as_uuid())
                .bind(purchaser.as_str())
                .bind(purchased_at)
                .fetch_optional(&self.pool)
                .await
            }
            TicketTransition::Release { authority } => {
                let query = match authority {
                    ReleaseAuthority::Holder(holder) => sqlx::query(
                        r"
                        UPDATE tickets
                        SET status = 'available', holder = NULL, reserved_until = NULL
                        WHERE id = $1 AND status = 'reserved' AND holder = $2
                        RETURNING *
                        ",
                    )
                    .bind(ticket_id.as_uuid())
                    .bind(holder.as_str()),
                    ReleaseAuthority::Sweeper => sqlx::query(
                        r"
                        UPDATE tickets
                        SET status = 'available', holder = NULL, reserved_until = NULL
                        WHERE id = $1 AND status = 'reserved'
                        RETURNING *
                        ",
                    )
                    .bind(ticket_id.as_uuid()),
                };
                query.fetch_optional(&self.pool).await
            }
        }
        .map_err(storage)?;

        match row {
            Some(row) => ticket_from_row(&row),
            None => Err(self.transition_mismatch(ticket_id, transition).await),
        }
    }

    async fn expired_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM tickets
            WHERE status = 'reserved' AND reserved_until <= $1
            ORDER BY competition_id, ticket_number
            ",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn commit_purchase(
        &self,
        competition_id: CompetitionId,
        ticket_ids: &[TicketId],
        purchaser: UserId,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Ticket>, Entry)> {
        let holder = purchaser.holder_id();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Per-ticket conditional update; any mismatch rolls the unit back.
        let mut tickets = Vec::with_capacity(ticket_ids.len());
        for ticket_id in ticket_ids {
            let row = sqlx::query(
                r"
                UPDATE tickets
                SET status = 'purchased', reserved_until = NULL, purchased_at = $4
                WHERE id = $1 AND competition_id = $2 AND status = 'reserved' AND holder = $3
                RETURNING *
                ",
            )
            .bind(ticket_id.as_uuid())
            .bind(competition_id.as_uuid())
            .bind(holder.as_str())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;

            match row {
                Some(row) => tickets.push(ticket_from_row(&row)?),
                None => {
                    drop(tx); // implicit rollback
                    return Err(self.purchase_mismatch(competition_id, *ticket_id).await);
                }
            }
        }

        let sold = to_db_count(u32::try_from(ticket_ids.len()).unwrap_or(u32::MAX))?;
        let updated = sqlx::query(
            "UPDATE competitions SET tickets_sold = tickets_sold + $2 WHERE id = $1",
        )
        .bind(competition_id.as_uuid())
        .bind(sold)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
        if updated.rows_affected() == 0 {
            drop(tx);
            return Err(TicketError::CompetitionNotFound { competition_id });
        }

        let entry = Entry {
            id: EntryId::new(),
            user_id: purchaser,
            competition_id,
            ticket_ids: ticket_ids.to_vec(),
            status: EntryStatus::Active,
            created_at: now,
        };
        let ticket_uuids: Vec<Uuid> = ticket_ids.iter().map(|id| *id.as_uuid()).collect();
        sqlx::query(
            r"
            INSERT INTO entries (id, user_id, competition_id, ticket_ids, status, created_at)
            VALUES ($1, $2, $3, $4, 'active', $5)
            ",
        )
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(competition_id.as_uuid())
        .bind(&ticket_uuids)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok((tickets, entry))
    }

    async fn record_draw(
        &self,
        competition_id: CompetitionId,
        winning_entry_id: EntryId,
        winning_ticket_id: TicketId,
        winner: UserId,
        now: DateTime<Utc>,
    ) -> Result<Win> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Compare-and-swap on the winner column: set exactly once.
        let updated = sqlx::query(
            r"
            UPDATE competitions
            SET winner_user_id = $2, status = 'completed'
            WHERE id = $1 AND winner_user_id IS NULL
            ",
        )
        .bind(competition_id.as_uuid())
        .bind(winner.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
        if updated.rows_affected() == 0 {
            drop(tx);
            return if self.competition_exists(competition_id).await? {
                Err(TicketError::AlreadyDrawn { competition_id })
            } else {
                Err(TicketError::CompetitionNotFound { competition_id })
            };
        }

        sqlx::query(
            r"
            UPDATE entries
            SET status = CASE WHEN id = $2 THEN 'won' ELSE 'lost' END
            WHERE competition_id = $1
            ",
        )
        .bind(competition_id.as_uuid())
        .bind(winning_entry_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let win = Win {
            id: WinId::new(),
            user_id: winner,
            competition_id,
            entry_id: winning_entry_id,
            ticket_id: winning_ticket_id,
            fulfillment: FulfillmentStatus::Pending,
            created_at: now,
        };
        sqlx::query(
            r"
            INSERT INTO wins (id, user_id, competition_id, entry_id, ticket_id, fulfillment, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            ",
        )
        .bind(win.id.as_uuid())
        .bind(win.user_id.as_uuid())
        .bind(competition_id.as_uuid())
        .bind(winning_entry_id.as_uuid())
        .bind(winning_ticket_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        info!(competition_id = %competition_id, winner = %winner, "Draw recorded");
        Ok(win)
    }

    async fn entries(&self, competition_id: CompetitionId) -> Result<Vec<Entry>> {
        let rows = sqlx::query(
            "SELECT * FROM entries WHERE competition_id = $1 ORDER BY created_at, id",
        )
        .bind(competition_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn entry_owning_ticket(&self, ticket_id: TicketId) -> Result<Entry> {
        let row = sqlx::query("SELECT * FROM entries WHERE $1 = ANY(ticket_ids)")
            .bind(ticket_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or(TicketError::EntryNotFound { ticket_id })?;
        entry_from_row(&row)
    }

    async fn update_fulfillment(&self, win_id: WinId, status: FulfillmentStatus) -> Result<Win> {
        let row = sqlx::query("UPDATE wins SET fulfillment = $2 WHERE id = $1 RETURNING *")
            .bind(win_id.as_uuid())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| TicketError::Storage(format!("win not found: {win_id}")))?;
        win_from_row(&row)
    }
}

// ────────────────────────────────────────────────────────────
// Row mapping
// ────────────────────────────────────────────────────────────

fn storage(e: sqlx::Error) -> TicketError {
    TicketError::Storage(e.to_string())
}

fn to_db_count(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| TicketError::Storage(format!("count out of range: {value}")))
}

fn from_db_count(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| TicketError::Storage(format!("negative count: {value}")))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| TicketError::Storage(format!("column {column}: {e}")))
}

fn competition_from_row(row: &PgRow) -> Result<Competition> {
    let status: String = get(row, "status")?;
    Ok(Competition {
        id: CompetitionId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        max_tickets: from_db_count(get(row, "max_tickets")?)?,
        ticket_price: raffle_core::types::Money::from_minor_units(get(
            row,
            "ticket_price_minor",
        )?),
        draw_date: get(row, "draw_date")?,
        tickets_sold: from_db_count(get(row, "tickets_sold")?)?,
        status: CompetitionStatus::parse(&status).map_err(TicketError::Storage)?,
        winner_user_id: get::<Option<Uuid>>(row, "winner_user_id")?.map(UserId::from_uuid),
        created_at: get(row, "created_at")?,
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket> {
    let status: String = get(row, "status")?;
    Ok(Ticket {
        id: TicketId::from_uuid(get(row, "id")?),
        competition_id: CompetitionId::from_uuid(get(row, "competition_id")?),
        number: TicketNumber::new(from_db_count(get(row, "ticket_number")?)?),
        status: TicketStatus::parse(&status).map_err(TicketError::Storage)?,
        holder: get::<Option<String>>(row, "holder")?.map(HolderId::new),
        reserved_until: get(row, "reserved_until")?,
        purchased_at: get(row, "purchased_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<Entry> {
    let status: String = get(row, "status")?;
    let ticket_ids: Vec<Uuid> = get(row, "ticket_ids")?;
    Ok(Entry {
        id: EntryId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        competition_id: CompetitionId::from_uuid(get(row, "competition_id")?),
        ticket_ids: ticket_ids.into_iter().map(TicketId::from_uuid).collect(),
        status: EntryStatus::parse(&status).map_err(TicketError::Storage)?,
        created_at: get(row, "created_at")?,
    })
}

fn win_from_row(row: &PgRow) -> Result<Win> {
    let fulfillment: String = get(row, "fulfillment")?;
    Ok(Win {
        id: WinId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        competition_id: CompetitionId::from_uuid(get(row, "competition_id")?),
        entry_id: EntryId::from_uuid(get(row, "entry_id")?),
        ticket_id: TicketId::from_uuid(get(row, "ticket_id")?),
        fulfillment: FulfillmentStatus::parse(&fulfillment).map_err(TicketError::Storage)?,
        created_at: get(row, "created_at")?,
    })
}
