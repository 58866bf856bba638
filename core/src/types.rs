//! Domain types for the ticket allocation and draw engine.
//!
//! A competition sells a fixed pool of numbered tickets. Tickets move through
//! a small state machine (available → reserved → purchased), entries group the
//! tickets bought together in one transaction, and a win records the outcome
//! of a draw.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a competition
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompetitionId(Uuid);

impl CompetitionId {
    /// Creates a new random `CompetitionId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CompetitionId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CompetitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompetitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket row (distinct from its number within the pool)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an entry (tickets purchased together)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random `EntryId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EntryId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a win record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinId(Uuid);

impl WinId {
    /// Creates a new random `WinId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `WinId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WinId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The holder identity this user presents when reserving or purchasing.
    ///
    /// Reservations are keyed by [`HolderId`] so that anonymous sessions and
    /// authenticated users share one representation; this bridges the two for
    /// the purchase precondition (holder must equal purchaser).
    #[must_use]
    pub fn holder_id(&self) -> HolderId {
        HolderId::new(format!("user:{}", self.0))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity holding a reservation: an authenticated user or an anonymous
/// checkout session.
///
/// String-backed so the auth collaborator can hand us either a session token
/// or a user-derived identity without this crate caring which.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(String);

impl HolderId {
    /// Create a holder identity from any string-like token
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identity string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&UserId> for HolderId {
    fn from(user: &UserId) -> Self {
        user.holder_id()
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// A ticket's number within its competition's pool, in `[1, max_tickets]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketNumber(u32);

impl TicketNumber {
    /// Wrap a raw number. Range validation against a pool happens at the
    /// store/engine boundary, not here.
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// The raw number
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary amount in minor units (pence/cents).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Create an amount from minor units
    #[must_use]
    pub const fn from_minor_units(amount: i64) -> Self {
        Self(amount)
    }

    /// The amount in minor units
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

// ============================================================================
// Status Enums
// ============================================================================

/// Allocation state of a single ticket.
///
/// `Purchased` is terminal: no transition ever leaves it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// In the pool, free to reserve
    Available,
    /// Held by someone pending payment, until `reserved_until`
    Reserved,
    /// Sold; terminal
    Purchased,
}

impl TicketStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Purchased => "purchased",
        }
    }

    /// Parse status from its database string representation.
    ///
    /// # Errors
    ///
    /// Returns the unrecognized input if it doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "purchased" => Ok(Self::Purchased),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a competition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompetitionStatus {
    /// Created but not yet accepting entries
    Draft,
    /// Open for entry
    Live,
    /// Drawn; winner recorded
    Completed,
    /// Withdrawn before completion
    Cancelled,
}

impl CompetitionStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Live => "live",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse status from its database string representation.
    ///
    /// # Errors
    ///
    /// Returns the unrecognized input if it doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "draft" => Ok(Self::Draft),
            "live" => Ok(Self::Live),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown competition status: {other}")),
        }
    }
}

impl fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome state of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    /// In a live competition, awaiting the draw
    Active,
    /// Owns the winning ticket
    Won,
    /// Did not own the winning ticket
    Lost,
}

impl EntryStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    /// Parse status from its database string representation.
    ///
    /// # Errors
    ///
    /// Returns the unrecognized input if it doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "active" => Ok(Self::Active),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fulfillment progress of a win, driven by the downstream prize-handling
/// collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    /// Recorded, winner not yet contacted
    Pending,
    /// Winner has claimed the prize
    Claimed,
    /// Prize delivered
    Delivered,
}

impl FulfillmentStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Delivered => "delivered",
        }
    }

    /// Parse status from its database string representation.
    ///
    /// # Errors
    ///
    /// Returns the unrecognized input if it doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(Self::Pending),
            "claimed" => Ok(Self::Claimed),
            "delivered" => Ok(Self::Delivered),
            other => Err(format!("unknown fulfillment status: {other}")),
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A time-boxed prize draw over a fixed pool of numbered tickets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    /// Competition identifier
    pub id: CompetitionId,
    /// Display name
    pub name: String,
    /// Fixed pool capacity; ticket numbers run `1..=max_tickets`
    pub max_tickets: u32,
    /// Price per ticket
    pub ticket_price: Money,
    /// When the draw becomes due regardless of sales
    pub draw_date: DateTime<Utc>,
    /// Count of purchased tickets, incremented atomically with each purchase
    pub tickets_sold: u32,
    /// Lifecycle state
    pub status: CompetitionStatus,
    /// Winner, set exactly once by the draw engine
    pub winner_user_id: Option<UserId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Competition {
    /// Whether new reservations are accepted.
    #[must_use]
    pub fn is_open_for_entry(&self) -> bool {
        self.status == CompetitionStatus::Live
    }

    /// Whether every ticket in the pool has been purchased.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.tickets_sold >= self.max_tickets
    }

    /// Whether the draw trigger condition holds: live, no winner yet, and
    /// either the draw date has passed or the pool is sold out.
    #[must_use]
    pub fn is_due_for_draw(&self, now: DateTime<Utc>) -> bool {
        self.status == CompetitionStatus::Live
            && self.winner_user_id.is_none()
            && (self.draw_date <= now || self.is_sold_out())
    }

    /// Whether a number falls inside this pool's `[1, max_tickets]` range.
    #[must_use]
    pub const fn contains_number(&self, number: TicketNumber) -> bool {
        number.value() >= 1 && number.value() <= self.max_tickets
    }
}

/// Parameters for creating a competition (and bulk-creating its pool).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCompetition {
    /// Display name
    pub name: String,
    /// Fixed pool capacity
    pub max_tickets: u32,
    /// Price per ticket
    pub ticket_price: Money,
    /// When the draw becomes due
    pub draw_date: DateTime<Utc>,
}

/// One numbered unit of a competition's inventory; the unit of allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Owning competition
    pub competition_id: CompetitionId,
    /// Position in the pool, unique within the competition
    pub number: TicketNumber,
    /// Allocation state
    pub status: TicketStatus,
    /// Current holder; present only while reserved or purchased
    pub holder: Option<HolderId>,
    /// Hold deadline; present only while reserved
    pub reserved_until: Option<DateTime<Utc>>,
    /// Purchase time; present only once purchased
    pub purchased_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// A fresh, unheld ticket in the pool.
    #[must_use]
    pub const fn available(competition_id: CompetitionId, id: TicketId, number: TicketNumber) -> Self {
        Self {
            id,
            competition_id,
            number,
            status: TicketStatus::Available,
            holder: None,
            reserved_until: None,
            purchased_at: None,
        }
    }

    /// Whether this ticket is reserved by the given holder.
    #[must_use]
    pub fn is_reserved_by(&self, holder: &HolderId) -> bool {
        self.status == TicketStatus::Reserved && self.holder.as_ref() == Some(holder)
    }

    /// Whether this reservation has lapsed at `now`.
    ///
    /// Always false for non-reserved tickets.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == TicketStatus::Reserved
            && self.reserved_until.is_some_and(|until| until <= now)
    }
}

/// The tickets one user purchased together in one transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry identifier
    pub id: EntryId,
    /// Purchasing user
    pub user_id: UserId,
    /// Owning competition
    pub competition_id: CompetitionId,
    /// Tickets in purchase order
    pub ticket_ids: Vec<TicketId>,
    /// Outcome state
    pub status: EntryStatus,
    /// Purchase time
    pub created_at: DateTime<Utc>,
}

/// The recorded outcome of a draw, handed to downstream fulfillment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Win {
    /// Win identifier
    pub id: WinId,
    /// Winning user
    pub user_id: UserId,
    /// Competition that was drawn
    pub competition_id: CompetitionId,
    /// Winning entry
    pub entry_id: EntryId,
    /// The drawn ticket
    pub ticket_id: TicketId,
    /// Prize-handling progress
    pub fulfillment: FulfillmentStatus,
    /// Draw time
    pub created_at: DateTime<Utc>,
}
