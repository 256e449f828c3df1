//! Repository for the `users` table and the eco-points ledger.

use sqlx::PgPool;

use reloop_core::badges::UserStats;
use reloop_core::types::DbId;

use crate::models::ledger::EcoPointsTransaction;
use crate::models::user::{CreateUser, LeaderboardEntry, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, username, email, is_verified, rating, total_exchanges, created_at, updated_at";

/// Ledger column list.
const LEDGER_COLUMNS: &str = "id, user_id, points, reason, created_at";

/// Provides operations for users and their point ledger.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a user as verified.
    ///
    /// Returns the updated row, or `None` if no such user exists.
    pub async fn mark_verified(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET is_verified = TRUE, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite a user's public rating with a freshly recomputed value.
    pub async fn update_rating(pool: &PgPool, id: DbId, rating: f64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET rating = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(rating)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Append one ledger transaction, returning the created row.
    ///
    /// The points > 0 and non-empty reason invariants are also enforced by
    /// CHECK constraints on the table.
    pub async fn append_points(
        pool: &PgPool,
        user_id: DbId,
        points: i32,
        reason: &str,
    ) -> Result<EcoPointsTransaction, sqlx::Error> {
        let query = format!(
            "INSERT INTO eco_points_transactions (user_id, points, reason)
             VALUES ($1, $2, $3)
             RETURNING {LEDGER_COLUMNS}"
        );
        sqlx::query_as::<_, EcoPointsTransaction>(&query)
            .bind(user_id)
            .bind(points)
            .bind(reason)
            .fetch_one(pool)
            .await
    }

    /// Current balance: the sum of all ledger rows for the user.
    pub async fn balance(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(points), 0)::BIGINT
             FROM eco_points_transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Full ledger for a user, newest first.
    pub async fn transactions(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<EcoPointsTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {LEDGER_COLUMNS} FROM eco_points_transactions
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, EcoPointsTransaction>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Stats snapshot used by the badge eligibility engine.
    ///
    /// Returns `None` if the user does not exist. `items_posted` counts all
    /// of the user's items regardless of status.
    pub async fn stats(pool: &PgPool, user_id: DbId) -> Result<Option<UserStats>, sqlx::Error> {
        let row = sqlx::query_as::<_, (i64, i64, i64, f64)>(
            "SELECT
                COALESCE((SELECT SUM(points) FROM eco_points_transactions
                          WHERE user_id = u.id), 0)::BIGINT,
                u.total_exchanges::BIGINT,
                (SELECT COUNT(*) FROM items WHERE owner_id = u.id),
                u.rating
             FROM users u WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(
            |(eco_points, total_exchanges, items_posted, rating)| UserStats {
                eco_points,
                total_exchanges,
                items_posted,
                rating,
            },
        ))
    }

    /// Users ranked by ledger balance, highest first.
    pub async fn leaderboard(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT u.id AS user_id, u.username,
                    COALESCE(SUM(t.points), 0)::BIGINT AS eco_points,
                    u.rating, u.total_exchanges
             FROM users u
             LEFT JOIN eco_points_transactions t ON t.user_id = u.id
             GROUP BY u.id
             ORDER BY eco_points DESC, u.id ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
