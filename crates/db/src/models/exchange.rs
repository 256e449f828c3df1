//! Exchange entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use reloop_core::error::CoreError;
use reloop_core::exchange::{participant_role, ExchangeStatus, ParticipantRole};
use reloop_core::types::{DbId, Timestamp};

/// Full exchange row from the `exchanges` table.
///
/// `giver_rating_*` is the rating authored *by* the giver about the
/// receiver; `receiver_rating_*` the reverse direction.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exchange {
    pub id: DbId,
    pub item_id: DbId,
    pub giver_id: DbId,
    pub receiver_id: DbId,
    pub status: String,
    pub message: Option<String>,
    pub scheduled_pickup: Option<Timestamp>,
    pub giver_confirmed_at: Option<Timestamp>,
    pub receiver_confirmed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub giver_rating_score: Option<i16>,
    pub giver_rating_review: Option<String>,
    pub giver_rated_at: Option<Timestamp>,
    pub receiver_rating_score: Option<i16>,
    pub receiver_rating_review: Option<String>,
    pub receiver_rated_at: Option<Timestamp>,
    /// Giver-side points paid on completion; the receiver got half of this.
    pub eco_points_awarded: i32,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Exchange {
    /// Parse the stored status into the closed enum.
    pub fn status(&self) -> Result<ExchangeStatus, CoreError> {
        ExchangeStatus::parse(&self.status)
    }

    /// Which side of the exchange `actor_id` is on, if any.
    pub fn role_of(&self, actor_id: DbId) -> Option<ParticipantRole> {
        participant_role(self.giver_id, self.receiver_id, actor_id)
    }

    /// The handoff confirmation timestamp recorded for a side.
    pub fn confirmed_by(&self, role: ParticipantRole) -> Option<Timestamp> {
        match role {
            ParticipantRole::Giver => self.giver_confirmed_at,
            ParticipantRole::Receiver => self.receiver_confirmed_at,
        }
    }

    /// The rating score authored by a side, if already given.
    pub fn rating_by(&self, role: ParticipantRole) -> Option<i16> {
        match role {
            ParticipantRole::Giver => self.giver_rating_score,
            ParticipantRole::Receiver => self.receiver_rating_score,
        }
    }

    /// Whether `actor_id` may still rate this exchange: completed, a
    /// participant, and their direction not yet rated.
    pub fn can_be_rated_by(&self, actor_id: DbId) -> bool {
        if self.status != ExchangeStatus::Completed.as_str() {
            return false;
        }
        match self.role_of(actor_id) {
            Some(role) => self.rating_by(role).is_none(),
            None => false,
        }
    }

    /// Whether both directions have been rated.
    pub fn has_been_rated(&self) -> bool {
        self.giver_rating_score.is_some() && self.receiver_rating_score.is_some()
    }
}

/// DTO for inserting a new exchange in `requested` status.
#[derive(Debug, Deserialize)]
pub struct CreateExchange {
    pub item_id: DbId,
    pub giver_id: DbId,
    pub receiver_id: DbId,
    pub message: Option<String>,
    pub scheduled_pickup: Option<Timestamp>,
}

/// Result of a handoff confirmation attempt that found the exchange in a
/// confirmable state.
#[derive(Debug, Clone)]
pub struct HandoffOutcome {
    pub exchange: Exchange,
    /// True only for the call that supplied the second confirmation and
    /// thereby completed the exchange.
    pub completed_now: bool,
}
