//! The exchange lifecycle orchestrator.
//!
//! Sequences each intent through the same pipeline: resolve the actor and
//! validate against the state machine, apply the transition through the
//! repository's atomic guarded update, then run the follow-on effects
//! (badge checks on completion) and fire a best-effort notification.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use reloop_core::error::CoreError;
use reloop_core::exchange::{
    ensure_participant, validate_transition, ExchangeStatus, ParticipantRole,
    MAX_CANCELLATION_REASON_LENGTH,
};
use reloop_core::rating;
use reloop_core::types::{DbId, Timestamp};
use reloop_db::models::exchange::{CreateExchange, Exchange};
use reloop_db::models::user::User;
use reloop_db::repositories::{ExchangeRepo, ItemRepo, UserRepo};
use reloop_events::{ExchangeEvent, ExchangeEventKind, Notifier};

use crate::economy::EconomyService;
use crate::error::ServiceResult;

/// Request DTO for initiating an exchange.
#[derive(Debug, Deserialize, Validate)]
pub struct InitiateExchange {
    pub item_id: DbId,
    pub giver_id: DbId,
    pub receiver_id: DbId,
    #[validate(length(max = 1000, message = "message must be at most 1000 characters"))]
    pub message: Option<String>,
    pub scheduled_pickup: Option<Timestamp>,
}

/// Result of a handoff confirmation.
#[derive(Debug, Clone)]
pub struct HandoffResult {
    pub exchange: Exchange,
    /// True only when this call supplied the second confirmation and
    /// completed the exchange.
    pub completed_now: bool,
}

/// Orchestrates the exchange lifecycle.
pub struct ExchangeService {
    pool: PgPool,
    notifier: Arc<Notifier>,
    economy: EconomyService,
}

impl ExchangeService {
    pub fn new(pool: PgPool, notifier: Arc<Notifier>) -> Self {
        let economy = EconomyService::new(pool.clone());
        Self {
            pool,
            notifier,
            economy,
        }
    }

    /// Giver offers an available item to a receiver.
    ///
    /// Creates the exchange in `requested` status and marks the item
    /// pending. A concurrent duplicate request for the same item fails
    /// with a conflict from the storage layer's unique index.
    pub async fn initiate(&self, input: &InitiateExchange) -> ServiceResult<Exchange> {
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let item = ItemRepo::find_by_id(&self.pool, input.item_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Item",
                id: input.item_id,
            })?;
        let giver = self.load_user(input.giver_id).await?;
        let receiver = self.load_user(input.receiver_id).await?;

        // Advisory pre-check for a precise message; the unique index on
        // active exchanges is the authoritative guard. Checked before the
        // availability gate so a duplicate request reads as a conflict, not
        // as an unavailable item.
        if ExchangeRepo::find_active_for_item(&self.pool, item.id)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "Item {} already has an active exchange",
                item.id
            ))
            .into());
        }

        reloop_core::exchange::validate_initiation(
            item.owner_id,
            item.status()?,
            giver.id,
            receiver.id,
            giver.trust(),
            receiver.trust(),
        )?;

        let create = CreateExchange {
            item_id: item.id,
            giver_id: giver.id,
            receiver_id: receiver.id,
            message: input.message.clone(),
            scheduled_pickup: input.scheduled_pickup,
        };
        let Some(created) = ExchangeRepo::create(&self.pool, &create).await? else {
            // The reservation lost a race after the pre-check. When an
            // active exchange now holds the item this caller is a duplicate
            // requester; only otherwise did the item leave `available` for
            // some other reason.
            if ExchangeRepo::find_active_for_item(&self.pool, item.id)
                .await?
                .is_some()
            {
                return Err(CoreError::Conflict(format!(
                    "Item {} already has an active exchange",
                    item.id
                ))
                .into());
            }
            return Err(CoreError::BusinessLogic(format!(
                "Item {} is no longer available",
                item.id
            ))
            .into());
        };

        tracing::info!(
            exchange_id = created.id,
            item_id = item.id,
            giver_id = giver.id,
            receiver_id = receiver.id,
            "Exchange requested"
        );

        let event = ExchangeEvent::new(ExchangeEventKind::Requested, created.id, &item.title)
            .with_actor(giver.id);
        self.notifier.notify(&event, &[receiver.email.as_str()]).await;

        Ok(created)
    }

    /// Receiver accepts a requested exchange.
    pub async fn accept(
        &self,
        exchange_id: DbId,
        actor_id: DbId,
        scheduled_pickup: Option<Timestamp>,
    ) -> ServiceResult<Exchange> {
        let exchange = self.load_exchange(exchange_id).await?;
        if actor_id != exchange.receiver_id {
            return Err(CoreError::Authorization(
                "Only the receiver may accept this exchange".to_string(),
            )
            .into());
        }
        validate_transition(exchange.status()?, ExchangeStatus::Accepted)?;

        let Some(accepted) = ExchangeRepo::accept(&self.pool, exchange_id, scheduled_pickup).await?
        else {
            // Lost a race; re-read so the error names the actual status.
            let current = self.load_exchange(exchange_id).await?;
            validate_transition(current.status()?, ExchangeStatus::Accepted)?;
            return Err(CoreError::BusinessLogic(
                "Exchange changed concurrently; retry".to_string(),
            )
            .into());
        };

        tracing::info!(exchange_id, actor_id, "Exchange accepted");
        self.notify_participants(&accepted, ExchangeEventKind::Accepted, actor_id, None, &[
            accepted.giver_id,
        ])
        .await;

        Ok(accepted)
    }

    /// A participant confirms the physical handoff.
    ///
    /// Idempotent per participant: repeating a confirmation (before or
    /// after completion) is a no-op. Returns `completed_now = true` only
    /// for the call that supplied the second confirmation, which also
    /// pays out the completion awards, marks the item exchanged, and runs
    /// badge checks for both parties.
    ///
    /// `points_override` replaces the computed giver-side award; the
    /// receiver still gets half of it.
    pub async fn confirm_handoff(
        &self,
        exchange_id: DbId,
        actor_id: DbId,
        points_override: Option<i32>,
    ) -> ServiceResult<HandoffResult> {
        if let Some(points) = points_override {
            if points <= 0 {
                return Err(CoreError::Validation(format!(
                    "Override points must be positive (got {points})"
                ))
                .into());
            }
        }

        let exchange = self.load_exchange(exchange_id).await?;
        let role = ensure_participant(exchange.giver_id, exchange.receiver_id, actor_id)?;

        match exchange.status()? {
            ExchangeStatus::Accepted => {}
            // A completed exchange holds both confirmations, so any further
            // confirm call is a repeat.
            ExchangeStatus::Completed => {
                return Ok(HandoffResult {
                    exchange,
                    completed_now: false,
                });
            }
            current => {
                return Err(CoreError::BusinessLogic(format!(
                    "Cannot confirm handoff while exchange is '{}'",
                    current.as_str()
                ))
                .into());
            }
        }

        let outcome =
            ExchangeRepo::confirm_handoff(&self.pool, exchange_id, role, points_override).await?;

        let Some(outcome) = outcome else {
            // Raced with the other confirmer or a cancellation; re-read.
            let current = self.load_exchange(exchange_id).await?;
            return match current.status()? {
                ExchangeStatus::Completed => Ok(HandoffResult {
                    exchange: current,
                    completed_now: false,
                }),
                status => Err(CoreError::BusinessLogic(format!(
                    "Cannot confirm handoff while exchange is '{}'",
                    status.as_str()
                ))
                .into()),
            };
        };

        if outcome.completed_now {
            tracing::info!(
                exchange_id,
                giver_id = outcome.exchange.giver_id,
                receiver_id = outcome.exchange.receiver_id,
                awarded = outcome.exchange.eco_points_awarded,
                "Exchange completed"
            );

            // Completion is a point-earning event for both parties.
            self.economy
                .check_and_unlock_badges(outcome.exchange.giver_id)
                .await?;
            self.economy
                .check_and_unlock_badges(outcome.exchange.receiver_id)
                .await?;

            self.notify_participants(
                &outcome.exchange,
                ExchangeEventKind::Completed,
                actor_id,
                None,
                &[outcome.exchange.giver_id, outcome.exchange.receiver_id],
            )
            .await;
        } else {
            tracing::info!(exchange_id, actor_id, "Handoff confirmed; waiting for other party");
        }

        Ok(HandoffResult {
            exchange: outcome.exchange,
            completed_now: outcome.completed_now,
        })
    }

    /// Either participant cancels an active exchange, with a required
    /// reason. The item reverts to available.
    pub async fn cancel(
        &self,
        exchange_id: DbId,
        actor_id: DbId,
        reason: &str,
    ) -> ServiceResult<Exchange> {
        if reason.trim().is_empty() {
            return Err(
                CoreError::Validation("Cancellation reason must not be empty".to_string()).into(),
            );
        }
        if reason.chars().count() > MAX_CANCELLATION_REASON_LENGTH {
            return Err(CoreError::Validation(format!(
                "Cancellation reason exceeds maximum length of {MAX_CANCELLATION_REASON_LENGTH} characters"
            ))
            .into());
        }

        let exchange = self.load_exchange(exchange_id).await?;
        let role = ensure_participant(exchange.giver_id, exchange.receiver_id, actor_id)?;
        validate_transition(exchange.status()?, ExchangeStatus::Cancelled)?;

        let Some(cancelled) = ExchangeRepo::cancel(&self.pool, exchange_id, actor_id, reason).await?
        else {
            let current = self.load_exchange(exchange_id).await?;
            validate_transition(current.status()?, ExchangeStatus::Cancelled)?;
            return Err(CoreError::BusinessLogic(
                "Exchange changed concurrently; retry".to_string(),
            )
            .into());
        };

        tracing::info!(exchange_id, actor_id, reason, "Exchange cancelled");

        let counterparty = match role {
            ParticipantRole::Giver => cancelled.receiver_id,
            ParticipantRole::Receiver => cancelled.giver_id,
        };
        self.notify_participants(
            &cancelled,
            ExchangeEventKind::Cancelled,
            actor_id,
            Some(reason),
            &[counterparty],
        )
        .await;

        Ok(cancelled)
    }

    /// A participant rates the other party after completion.
    ///
    /// Once both directions are rated, both participants' public ratings
    /// are recomputed from their full received-score history.
    pub async fn rate(
        &self,
        exchange_id: DbId,
        rater_id: DbId,
        score: i16,
        review: Option<&str>,
    ) -> ServiceResult<Exchange> {
        rating::validate_score(score)?;
        rating::validate_review(review)?;

        let exchange = self.load_exchange(exchange_id).await?;
        let role = ensure_participant(exchange.giver_id, exchange.receiver_id, rater_id)?;
        if exchange.status()? != ExchangeStatus::Completed {
            return Err(CoreError::BusinessLogic(
                "Exchange must be completed before rating".to_string(),
            )
            .into());
        }
        if exchange.rating_by(role).is_some() {
            return Err(CoreError::BusinessLogic(
                "You have already rated this exchange".to_string(),
            )
            .into());
        }

        let Some(rated) =
            ExchangeRepo::set_rating(&self.pool, exchange_id, role, score, review).await?
        else {
            // The guarded update lost a race with a duplicate submission.
            return Err(CoreError::BusinessLogic(
                "You have already rated this exchange".to_string(),
            )
            .into());
        };

        tracing::info!(exchange_id, rater_id, score, "Exchange rated");

        if rated.has_been_rated() {
            for user_id in [rated.giver_id, rated.receiver_id] {
                let scores = ExchangeRepo::received_scores(&self.pool, user_id).await?;
                if let Some(average) = rating::aggregate(&scores) {
                    UserRepo::update_rating(&self.pool, user_id, average).await?;
                }
            }
            tracing::info!(exchange_id, "Both ratings present; participant ratings recomputed");
        }

        Ok(rated)
    }

    /// Load one exchange, failing with `NotFound` if missing.
    pub async fn details(&self, exchange_id: DbId) -> ServiceResult<Exchange> {
        self.load_exchange(exchange_id).await
    }

    /// All exchanges a user participated in, newest first.
    pub async fn history(&self, user_id: DbId) -> ServiceResult<Vec<Exchange>> {
        Ok(ExchangeRepo::history(&self.pool, user_id).await?)
    }

    /// A user's active (requested/accepted) exchanges.
    pub async fn active(&self, user_id: DbId) -> ServiceResult<Vec<Exchange>> {
        Ok(ExchangeRepo::active(&self.pool, user_id).await?)
    }

    /// Completed exchanges the user has not yet rated.
    pub async fn unrated(&self, user_id: DbId) -> ServiceResult<Vec<Exchange>> {
        Ok(ExchangeRepo::unrated(&self.pool, user_id).await?)
    }

    async fn load_exchange(&self, id: DbId) -> ServiceResult<Exchange> {
        Ok(ExchangeRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Exchange",
                id,
            })?)
    }

    async fn load_user(&self, id: DbId) -> ServiceResult<User> {
        Ok(UserRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id })?)
    }

    /// Fire a best-effort notification to the given participants. Lookup
    /// failures are logged and swallowed like delivery failures; they must
    /// never fail the completed operation.
    async fn notify_participants(
        &self,
        exchange: &Exchange,
        kind: ExchangeEventKind,
        actor_id: DbId,
        detail: Option<&str>,
        recipient_ids: &[DbId],
    ) {
        let item_title = match ItemRepo::find_by_id(&self.pool, exchange.item_id).await {
            Ok(Some(item)) => item.title,
            Ok(None) => format!("item #{}", exchange.item_id),
            Err(err) => {
                tracing::warn!(error = %err, exchange_id = exchange.id, "Skipping notification");
                return;
            }
        };

        let mut event = ExchangeEvent::new(kind, exchange.id, item_title).with_actor(actor_id);
        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }

        let mut recipients = Vec::new();
        for &user_id in recipient_ids {
            match UserRepo::find_by_id(&self.pool, user_id).await {
                Ok(Some(user)) => recipients.push(user.email),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, user_id, "Skipping notification recipient");
                }
            }
        }
        let refs: Vec<&str> = recipients.iter().map(String::as_str).collect();
        self.notifier.notify(&event, &refs).await;
    }
}
