//! The reservation state machine: validated transition request types.
//!
//! Every mutation of a ticket's status goes through a [`TicketTransition`]
//! applied as a single conditional update, guarded by the ticket's *current*
//! status (and holder, where the transition cares). A racing sweep and a
//! racing purchase on the same ticket therefore cannot both apply: whichever
//! update matches the still-current status wins and the other observes a
//! precondition mismatch.
//!
//! ```text
//! available ──reserve──▶ reserved ──purchase──▶ purchased (terminal)
//!     ▲                      │
//!     └──────release─────────┘   (holder or sweeper)
//! ```

use crate::error::{Result, TicketError};
use crate::types::{HolderId, Ticket, TicketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is asking for a `reserved → available` release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseAuthority {
    /// The original holder cancelling their own hold
    Holder(HolderId),
    /// The expiry sweeper reclaiming a lapsed hold
    Sweeper,
}

impl ReleaseAuthority {
    /// Whether this authority may release the given ticket.
    ///
    /// The sweeper may release any reserved ticket; a holder only their own.
    #[must_use]
    pub fn may_release(&self, ticket: &Ticket) -> bool {
        match self {
            Self::Sweeper => true,
            Self::Holder(holder) => ticket.holder.as_ref() == Some(holder),
        }
    }
}

/// A validated request to move one ticket through the state machine.
///
/// Replaces ad-hoc partial-update field bags: each variant carries exactly
/// the fields its transition writes, and [`apply`](Self::apply) refuses any
/// request whose precondition does not hold before storage is touched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TicketTransition {
    /// `available → reserved`: set holder and hold deadline.
    Reserve {
        /// Who is taking the hold
        holder: HolderId,
        /// When the hold lapses
        reserved_until: DateTime<Utc>,
    },
    /// `reserved → purchased`: terminal; stamps the purchase time.
    Purchase {
        /// Who is buying; must equal the current holder
        purchaser: HolderId,
        /// Purchase timestamp
        purchased_at: DateTime<Utc>,
    },
    /// `reserved → available`: clears holder and hold deadline.
    Release {
        /// Holder cancelling, or the sweeper reclaiming
        authority: ReleaseAuthority,
    },
}

impl TicketTransition {
    /// The status a ticket must currently have for this transition to apply.
    #[must_use]
    pub const fn required_status(&self) -> TicketStatus {
        match self {
            Self::Reserve { .. } => TicketStatus::Available,
            Self::Purchase { .. } | Self::Release { .. } => TicketStatus::Reserved,
        }
    }

    /// Short name for logs and metrics labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reserve { .. } => "reserve",
            Self::Purchase { .. } => "purchase",
            Self::Release { .. } => "release",
        }
    }

    /// Check the precondition and produce the post-transition ticket.
    ///
    /// Pure: the store is responsible for swapping the result in under
    /// whatever atomicity it provides (one mutex'd map entry, or a
    /// conditional `UPDATE`). Holder mismatches on purchase surface as
    /// [`TicketError::TicketNotReserved`]; release by the wrong holder and
    /// any status mismatch surface as [`TicketError::InvalidTransition`].
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket's current status (or holder) does not
    /// satisfy this transition's precondition.
    pub fn apply(&self, ticket: &Ticket) -> Result<Ticket> {
        let required = self.required_status();
        if ticket.status != required {
            return Err(TicketError::InvalidTransition {
                current: ticket.status,
                required,
            });
        }

        match self {
            Self::Reserve {
                holder,
                reserved_until,
            } => Ok(Ticket {
                status: TicketStatus::Reserved,
                holder: Some(holder.clone()),
                reserved_until: Some(*reserved_until),
                ..ticket.clone()
            }),

            Self::Purchase {
                purchaser,
                purchased_at,
            } => {
                if ticket.holder.as_ref() != Some(purchaser) {
                    return Err(TicketError::TicketNotReserved {
                        ticket_id: ticket.id,
                    });
                }
                Ok(Ticket {
                    status: TicketStatus::Purchased,
                    reserved_until: None,
                    purchased_at: Some(*purchased_at),
                    ..ticket.clone()
                })
            }

            Self::Release { authority } => {
                if !authority.may_release(ticket) {
                    return Err(TicketError::InvalidTransition {
                        current: ticket.status,
                        required,
                    });
                }
                Ok(Ticket {
                    status: TicketStatus::Available,
                    holder: None,
                    reserved_until: None,
                    ..ticket.clone()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{CompetitionId, TicketId, TicketNumber};
    use chrono::Duration;

    fn available_ticket() -> Ticket {
        Ticket::available(CompetitionId::new(), TicketId::new(), TicketNumber::new(1))
    }

    fn reserved_ticket(holder: &HolderId) -> Ticket {
        let transition = TicketTransition::Reserve {
            holder: holder.clone(),
            reserved_until: Utc::now() + Duration::minutes(10),
        };
        transition.apply(&available_ticket()).unwrap()
    }

    #[test]
    fn reserve_sets_holder_and_deadline() {
        let holder = HolderId::new("session-a");
        let until = Utc::now() + Duration::minutes(10);
        let ticket = TicketTransition::Reserve {
            holder: holder.clone(),
            reserved_until: until,
        }
        .apply(&available_ticket())
        .unwrap();

        assert_eq!(ticket.status, TicketStatus::Reserved);
        assert_eq!(ticket.holder, Some(holder));
        assert_eq!(ticket.reserved_until, Some(until));
    }

    #[test]
    fn reserve_refuses_reserved_ticket() {
        let holder = HolderId::new("session-a");
        let ticket = reserved_ticket(&holder);
        let err = TicketTransition::Reserve {
            holder: HolderId::new("session-b"),
            reserved_until: Utc::now(),
        }
        .apply(&ticket)
        .unwrap_err();
        assert_eq!(
            err,
            TicketError::InvalidTransition {
                current: TicketStatus::Reserved,
                required: TicketStatus::Available,
            }
        );
    }

    #[test]
    fn purchase_requires_matching_holder() {
        let holder = HolderId::new("session-a");
        let ticket = reserved_ticket(&holder);

        let err = TicketTransition::Purchase {
            purchaser: HolderId::new("session-b"),
            purchased_at: Utc::now(),
        }
        .apply(&ticket)
        .unwrap_err();
        assert!(matches!(err, TicketError::TicketNotReserved { .. }));

        let bought = TicketTransition::Purchase {
            purchaser: holder,
            purchased_at: Utc::now(),
        }
        .apply(&ticket)
        .unwrap();
        assert_eq!(bought.status, TicketStatus::Purchased);
        assert!(bought.reserved_until.is_none());
        assert!(bought.purchased_at.is_some());
    }

    #[test]
    fn available_never_transitions_directly_to_purchased() {
        let err = TicketTransition::Purchase {
            purchaser: HolderId::new("session-a"),
            purchased_at: Utc::now(),
        }
        .apply(&available_ticket())
        .unwrap_err();
        assert_eq!(
            err,
            TicketError::InvalidTransition {
                current: TicketStatus::Available,
                required: TicketStatus::Reserved,
            }
        );
    }

    #[test]
    fn purchased_is_terminal() {
        let holder = HolderId::new("session-a");
        let bought = TicketTransition::Purchase {
            purchaser: holder.clone(),
            purchased_at: Utc::now(),
        }
        .apply(&reserved_ticket(&holder))
        .unwrap();

        // A late-running sweep must not revert a purchase.
        let sweep = TicketTransition::Release {
            authority: ReleaseAuthority::Sweeper,
        };
        assert!(sweep.apply(&bought).is_err());

        let re_reserve = TicketTransition::Reserve {
            holder,
            reserved_until: Utc::now(),
        };
        assert!(re_reserve.apply(&bought).is_err());
    }

    #[test]
    fn release_by_holder_and_sweeper_but_not_stranger() {
        let holder = HolderId::new("session-a");
        let ticket = reserved_ticket(&holder);

        let stranger = TicketTransition::Release {
            authority: ReleaseAuthority::Holder(HolderId::new("session-b")),
        };
        assert!(stranger.apply(&ticket).is_err());

        let own = TicketTransition::Release {
            authority: ReleaseAuthority::Holder(holder),
        }
        .apply(&ticket)
        .unwrap();
        assert_eq!(own.status, TicketStatus::Available);
        assert!(own.holder.is_none());
        assert!(own.reserved_until.is_none());

        let swept = TicketTransition::Release {
            authority: ReleaseAuthority::Sweeper,
        }
        .apply(&ticket)
        .unwrap();
        assert_eq!(swept.status, TicketStatus::Available);
    }
}
