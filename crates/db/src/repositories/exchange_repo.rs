//! Repository for the `exchanges` table.
//!
//! The lifecycle-mutating methods here are the atomic half of the state
//! machine: every transition is applied as a status-guarded UPDATE, and the
//! steps that must not be torn apart (item reservation on creation, item
//! release on cancellation, the full completion side-effect sequence) run
//! inside a single transaction opened in the method.

use sqlx::PgPool;

use reloop_core::exchange::{ExchangeStatus, ParticipantRole};
use reloop_core::points::{
    completion_award, COMPLETION_REASON_GIVER, COMPLETION_REASON_RECEIVER,
};
use reloop_core::types::DbId;

use crate::models::exchange::{CreateExchange, Exchange, HandoffOutcome};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, item_id, giver_id, receiver_id, status, message, scheduled_pickup, \
    giver_confirmed_at, receiver_confirmed_at, completed_at, \
    giver_rating_score, giver_rating_review, giver_rated_at, \
    receiver_rating_score, receiver_rating_review, receiver_rated_at, \
    eco_points_awarded, cancellation_reason, cancelled_by, created_at, updated_at";

/// Provides lifecycle operations for exchanges.
pub struct ExchangeRepo;

impl ExchangeRepo {
    /// Create an exchange in `requested` status and reserve its item, in
    /// one transaction.
    ///
    /// Returns `None` if the item was not `available` (nothing is written).
    /// A concurrent duplicate surfaces as a unique violation of
    /// `uq_exchanges_active_item` and propagates as `sqlx::Error`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateExchange,
    ) -> Result<Option<Exchange>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let reserved = sqlx::query(
            "UPDATE items SET status = 'pending', updated_at = NOW()
             WHERE id = $1 AND status = 'available'",
        )
        .bind(input.item_id)
        .execute(&mut *tx)
        .await?;
        if reserved.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO exchanges (item_id, giver_id, receiver_id, message, scheduled_pickup)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let exchange = sqlx::query_as::<_, Exchange>(&query)
            .bind(input.item_id)
            .bind(input.giver_id)
            .bind(input.receiver_id)
            .bind(&input.message)
            .bind(input.scheduled_pickup)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(exchange))
    }

    /// Find an exchange by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Exchange>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exchanges WHERE id = $1");
        sqlx::query_as::<_, Exchange>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The active (requested/accepted) exchange for an item, if one exists.
    pub async fn find_active_for_item(
        pool: &PgPool,
        item_id: DbId,
    ) -> Result<Option<Exchange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exchanges
             WHERE item_id = $1 AND status IN ('requested', 'accepted')"
        );
        sqlx::query_as::<_, Exchange>(&query)
            .bind(item_id)
            .fetch_optional(pool)
            .await
    }

    /// Move a requested exchange to `accepted`, optionally setting the
    /// pickup time.
    ///
    /// Returns `None` when the exchange is missing or no longer in
    /// `requested` status.
    pub async fn accept(
        pool: &PgPool,
        id: DbId,
        scheduled_pickup: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Option<Exchange>, sqlx::Error> {
        let query = format!(
            "UPDATE exchanges SET
                status = 'accepted',
                scheduled_pickup = COALESCE($2, scheduled_pickup),
                updated_at = NOW()
             WHERE id = $1 AND status = 'requested'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Exchange>(&query)
            .bind(id)
            .bind(scheduled_pickup)
            .fetch_optional(pool)
            .await
    }

    /// Cancel an active exchange and release its item, in one transaction.
    ///
    /// Returns `None` when the exchange is missing or already terminal.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        cancelled_by: DbId,
        reason: &str,
    ) -> Result<Option<Exchange>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE exchanges SET
                status = 'cancelled',
                cancellation_reason = $2,
                cancelled_by = $3,
                updated_at = NOW()
             WHERE id = $1 AND status IN ('requested', 'accepted')
             RETURNING {COLUMNS}"
        );
        let exchange = sqlx::query_as::<_, Exchange>(&query)
            .bind(id)
            .bind(reason)
            .bind(cancelled_by)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(exchange) = exchange else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE items SET status = 'available', updated_at = NOW()
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(exchange.item_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(exchange))
    }

    /// Record one side's handoff confirmation and, when it is the second
    /// confirmation, complete the exchange with all side effects in the
    /// same transaction.
    ///
    /// The confirmation is a single conditional UPDATE guarded on
    /// `status = 'accepted'`: `COALESCE` keeps the first confirmation
    /// timestamp on repeats, and the status flips to `completed` in the
    /// same statement the moment both sides are present, so two concurrent
    /// confirmers serialize on the row lock and exactly one observes the
    /// completion. Completion side effects (item marked exchanged, both
    /// ledger awards, both exchange counters, the recorded award) commit
    /// atomically with it.
    ///
    /// Returns `None` when the exchange is missing or not in `accepted`
    /// status; the caller decides whether that is an error or an idempotent
    /// repeat.
    pub async fn confirm_handoff(
        pool: &PgPool,
        id: DbId,
        role: ParticipantRole,
        points_override: Option<i32>,
    ) -> Result<Option<HandoffOutcome>, sqlx::Error> {
        let query = match role {
            ParticipantRole::Giver => format!(
                "UPDATE exchanges SET
                    giver_confirmed_at = COALESCE(giver_confirmed_at, NOW()),
                    status = CASE WHEN receiver_confirmed_at IS NOT NULL
                                  THEN 'completed' ELSE status END,
                    completed_at = CASE WHEN receiver_confirmed_at IS NOT NULL
                                        THEN NOW() ELSE completed_at END,
                    updated_at = NOW()
                 WHERE id = $1 AND status = 'accepted'
                 RETURNING {COLUMNS}"
            ),
            ParticipantRole::Receiver => format!(
                "UPDATE exchanges SET
                    receiver_confirmed_at = COALESCE(receiver_confirmed_at, NOW()),
                    status = CASE WHEN giver_confirmed_at IS NOT NULL
                                  THEN 'completed' ELSE status END,
                    completed_at = CASE WHEN giver_confirmed_at IS NOT NULL
                                        THEN NOW() ELSE completed_at END,
                    updated_at = NOW()
                 WHERE id = $1 AND status = 'accepted'
                 RETURNING {COLUMNS}"
            ),
        };

        let mut tx = pool.begin().await?;

        let Some(mut exchange) = sqlx::query_as::<_, Exchange>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let completed_now = exchange.status == ExchangeStatus::Completed.as_str();
        if completed_now {
            let duration = match exchange.completed_at {
                Some(done) => done - exchange.created_at,
                None => chrono::Duration::zero(),
            };
            let award = completion_award(duration, points_override);

            sqlx::query(
                "UPDATE items SET status = 'exchanged', updated_at = NOW()
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(exchange.item_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO eco_points_transactions (user_id, points, reason)
                 VALUES ($1, $2, $3), ($4, $5, $6)",
            )
            .bind(exchange.giver_id)
            .bind(award.giver_points)
            .bind(COMPLETION_REASON_GIVER)
            .bind(exchange.receiver_id)
            .bind(award.receiver_points)
            .bind(COMPLETION_REASON_RECEIVER)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE users SET total_exchanges = total_exchanges + 1, updated_at = NOW()
                 WHERE id = $1 OR id = $2",
            )
            .bind(exchange.giver_id)
            .bind(exchange.receiver_id)
            .execute(&mut *tx)
            .await?;

            let record = format!(
                "UPDATE exchanges SET eco_points_awarded = $2, updated_at = NOW()
                 WHERE id = $1
                 RETURNING {COLUMNS}"
            );
            exchange = sqlx::query_as::<_, Exchange>(&record)
                .bind(id)
                .bind(award.giver_points)
                .fetch_one(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(HandoffOutcome {
            exchange,
            completed_now,
        }))
    }

    /// Record one side's rating of the other, guarded against double
    /// rating and non-completed exchanges.
    ///
    /// Returns `None` when the exchange is missing, not completed, or this
    /// side already rated.
    pub async fn set_rating(
        pool: &PgPool,
        id: DbId,
        role: ParticipantRole,
        score: i16,
        review: Option<&str>,
    ) -> Result<Option<Exchange>, sqlx::Error> {
        let query = match role {
            ParticipantRole::Giver => format!(
                "UPDATE exchanges SET
                    giver_rating_score = $2,
                    giver_rating_review = $3,
                    giver_rated_at = NOW(),
                    updated_at = NOW()
                 WHERE id = $1 AND status = 'completed' AND giver_rating_score IS NULL
                 RETURNING {COLUMNS}"
            ),
            ParticipantRole::Receiver => format!(
                "UPDATE exchanges SET
                    receiver_rating_score = $2,
                    receiver_rating_review = $3,
                    receiver_rated_at = NOW(),
                    updated_at = NOW()
                 WHERE id = $1 AND status = 'completed' AND receiver_rating_score IS NULL
                 RETURNING {COLUMNS}"
            ),
        };
        sqlx::query_as::<_, Exchange>(&query)
            .bind(id)
            .bind(score)
            .bind(review)
            .fetch_optional(pool)
            .await
    }

    /// Every score a user has received across completed exchanges, in both
    /// directions.
    pub async fn received_scores(pool: &PgPool, user_id: DbId) -> Result<Vec<i16>, sqlx::Error> {
        sqlx::query_scalar::<_, i16>(
            "SELECT receiver_rating_score FROM exchanges
             WHERE giver_id = $1 AND status = 'completed'
               AND receiver_rating_score IS NOT NULL
             UNION ALL
             SELECT giver_rating_score FROM exchanges
             WHERE receiver_id = $1 AND status = 'completed'
               AND giver_rating_score IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// All exchanges a user participated in, newest first.
    pub async fn history(pool: &PgPool, user_id: DbId) -> Result<Vec<Exchange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exchanges
             WHERE giver_id = $1 OR receiver_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Exchange>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// A user's active (requested/accepted) exchanges, newest first.
    pub async fn active(pool: &PgPool, user_id: DbId) -> Result<Vec<Exchange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exchanges
             WHERE (giver_id = $1 OR receiver_id = $1)
               AND status IN ('requested', 'accepted')
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Exchange>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Completed exchanges where the user has not yet rated their side.
    pub async fn unrated(pool: &PgPool, user_id: DbId) -> Result<Vec<Exchange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exchanges
             WHERE status = 'completed'
               AND ((giver_id = $1 AND giver_rating_score IS NULL)
                 OR (receiver_id = $1 AND receiver_rating_score IS NULL))
             ORDER BY completed_at DESC, id DESC"
        );
        sqlx::query_as::<_, Exchange>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
