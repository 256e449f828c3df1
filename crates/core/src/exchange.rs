//! Exchange lifecycle rules: status enums, transition tables, participant
//! roles, and the initiation guard checks.
//!
//! Statuses are stored as text in the database; the enums here are the
//! single source of truth for which values and transitions are legal. The
//! repository layer enforces the same transitions with status-guarded
//! updates so a lost race can never produce an illegal state.

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum public rating required of both parties to initiate an exchange.
pub const MIN_INITIATION_RATING: f64 = 2.0;

/// Maximum length of the optional request message.
pub const MAX_MESSAGE_LENGTH: usize = 1_000;

/// Maximum length of a cancellation reason.
pub const MAX_CANCELLATION_REASON_LENGTH: usize = 2_000;

// ---------------------------------------------------------------------------
// ExchangeStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an exchange.
///
/// `Requested` is the initial state. `Completed` and `Cancelled` are
/// terminal and reject every further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    Requested,
    Accepted,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    /// The status value as stored in the `exchanges.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeStatus::Requested => "requested",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::Completed => "completed",
            ExchangeStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status value.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "requested" => Ok(ExchangeStatus::Requested),
            "accepted" => Ok(ExchangeStatus::Accepted),
            "completed" => Ok(ExchangeStatus::Completed),
            "cancelled" => Ok(ExchangeStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown exchange status '{other}'"
            ))),
        }
    }

    /// Returns the set of statuses this status may transition to.
    pub fn valid_transitions(self) -> &'static [ExchangeStatus] {
        match self {
            ExchangeStatus::Requested => &[ExchangeStatus::Accepted, ExchangeStatus::Cancelled],
            ExchangeStatus::Accepted => &[ExchangeStatus::Completed, ExchangeStatus::Cancelled],
            ExchangeStatus::Completed | ExchangeStatus::Cancelled => &[],
        }
    }

    /// Whether `next` is a legal transition from this status.
    pub fn can_transition(self, next: ExchangeStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether an exchange in this status blocks new exchanges for its item.
    pub fn is_active(self) -> bool {
        matches!(self, ExchangeStatus::Requested | ExchangeStatus::Accepted)
    }
}

/// Validate that an exchange may move from `current` to `next`.
pub fn validate_transition(
    current: ExchangeStatus,
    next: ExchangeStatus,
) -> Result<(), CoreError> {
    if current.can_transition(next) {
        Ok(())
    } else {
        Err(CoreError::BusinessLogic(format!(
            "Cannot transition exchange from '{}' to '{}'",
            current.as_str(),
            next.as_str()
        )))
    }
}

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an item, mutated in lockstep with its exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Available,
    Pending,
    Exchanged,
    Removed,
}

impl ItemStatus {
    /// The status value as stored in the `items.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Pending => "pending",
            ItemStatus::Exchanged => "exchanged",
            ItemStatus::Removed => "removed",
        }
    }

    /// Parse a stored status value.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "available" => Ok(ItemStatus::Available),
            "pending" => Ok(ItemStatus::Pending),
            "exchanged" => Ok(ItemStatus::Exchanged),
            "removed" => Ok(ItemStatus::Removed),
            other => Err(CoreError::Validation(format!(
                "Unknown item status '{other}'"
            ))),
        }
    }

    /// Returns the set of statuses this status may transition to.
    pub fn valid_transitions(self) -> &'static [ItemStatus] {
        match self {
            ItemStatus::Available => &[ItemStatus::Pending, ItemStatus::Removed],
            ItemStatus::Pending => &[
                ItemStatus::Available,
                ItemStatus::Exchanged,
                ItemStatus::Removed,
            ],
            ItemStatus::Exchanged => &[ItemStatus::Removed],
            ItemStatus::Removed => &[],
        }
    }

    /// Whether `next` is a legal transition from this status.
    pub fn can_transition(self, next: ItemStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Which side of an exchange a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Giver,
    Receiver,
}

impl ParticipantRole {
    /// The opposite side of the exchange.
    pub fn other(self) -> ParticipantRole {
        match self {
            ParticipantRole::Giver => ParticipantRole::Receiver,
            ParticipantRole::Receiver => ParticipantRole::Giver,
        }
    }
}

/// Determine which role `actor_id` plays in an exchange, if any.
pub fn participant_role(
    giver_id: DbId,
    receiver_id: DbId,
    actor_id: DbId,
) -> Option<ParticipantRole> {
    if actor_id == giver_id {
        Some(ParticipantRole::Giver)
    } else if actor_id == receiver_id {
        Some(ParticipantRole::Receiver)
    } else {
        None
    }
}

/// Resolve `actor_id` to a participant role or fail with an authorization
/// error.
pub fn ensure_participant(
    giver_id: DbId,
    receiver_id: DbId,
    actor_id: DbId,
) -> Result<ParticipantRole, CoreError> {
    participant_role(giver_id, receiver_id, actor_id).ok_or_else(|| {
        CoreError::Authorization(format!(
            "User {actor_id} is not a participant in this exchange"
        ))
    })
}

// ---------------------------------------------------------------------------
// Initiation guards
// ---------------------------------------------------------------------------

/// The trust-related slice of a user needed to gate exchange initiation.
#[derive(Debug, Clone, Copy)]
pub struct TrustSnapshot {
    pub is_verified: bool,
    pub rating: f64,
}

/// Validate every precondition for initiating an exchange.
///
/// Checked in order: item availability, ownership, self-exchange, and the
/// verification / minimum-rating gates for both parties. The "no active
/// exchange for this item" rule is *not* checked here; it is enforced by
/// the storage layer's unique index, which is the only race-free check.
pub fn validate_initiation(
    item_owner_id: DbId,
    item_status: ItemStatus,
    giver_id: DbId,
    receiver_id: DbId,
    giver: TrustSnapshot,
    receiver: TrustSnapshot,
) -> Result<(), CoreError> {
    if item_status != ItemStatus::Available {
        return Err(CoreError::BusinessLogic(format!(
            "Item is not available for exchange (status '{}')",
            item_status.as_str()
        )));
    }

    if item_owner_id != giver_id {
        return Err(CoreError::Authorization(
            "Only the item's owner may offer it for exchange".to_string(),
        ));
    }

    if giver_id == receiver_id {
        return Err(CoreError::BusinessLogic(
            "Cannot initiate an exchange with yourself".to_string(),
        ));
    }

    for (label, user) in [("Giver", giver), ("Receiver", receiver)] {
        if !user.is_verified {
            return Err(CoreError::BusinessLogic(format!(
                "{label} must be verified to participate in exchanges"
            )));
        }
        if user.rating < MIN_INITIATION_RATING {
            return Err(CoreError::BusinessLogic(format!(
                "{label} rating {:.1} is below the minimum of {MIN_INITIATION_RATING:.1}",
                user.rating
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
