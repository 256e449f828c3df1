//! Repository for the `achievements` table.
//!
//! Unlocking relies on the `uq_achievements_user_badge` constraint plus an
//! `ON CONFLICT ... DO UPDATE ... WHERE unlocked_at IS NULL` write, so that
//! under concurrent eligibility checks exactly one call performs the unlock
//! and collects the right to pay the badge reward.

use sqlx::PgPool;

use reloop_core::types::DbId;

use crate::models::achievement::{Achievement, UserAchievement};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, badge_id, progress, unlocked_at, created_at, updated_at";

/// Provides operations for badge achievements.
pub struct AchievementRepo;

impl AchievementRepo {
    /// Find a user's achievement record for one badge.
    pub async fn find(
        pool: &PgPool,
        user_id: DbId,
        badge_id: DbId,
    ) -> Result<Option<Achievement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM achievements WHERE user_id = $1 AND badge_id = $2"
        );
        sqlx::query_as::<_, Achievement>(&query)
            .bind(user_id)
            .bind(badge_id)
            .fetch_optional(pool)
            .await
    }

    /// Unlock a badge for a user if it is not already unlocked.
    ///
    /// Returns the achievement row only when *this* call performed the
    /// unlock; `None` means another call got there first (or earlier).
    pub async fn try_unlock(
        pool: &PgPool,
        user_id: DbId,
        badge_id: DbId,
    ) -> Result<Option<Achievement>, sqlx::Error> {
        let query = format!(
            "INSERT INTO achievements (user_id, badge_id, progress, unlocked_at)
             VALUES ($1, $2, 100, NOW())
             ON CONFLICT (user_id, badge_id) DO UPDATE
                SET progress = 100, unlocked_at = NOW(), updated_at = NOW()
                WHERE achievements.unlocked_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Achievement>(&query)
            .bind(user_id)
            .bind(badge_id)
            .fetch_optional(pool)
            .await
    }

    /// Record partial progress toward a badge, for "in progress" display.
    ///
    /// Leaves already-unlocked achievements untouched and returns `None`
    /// for them.
    pub async fn upsert_progress(
        pool: &PgPool,
        user_id: DbId,
        badge_id: DbId,
        progress: f32,
    ) -> Result<Option<Achievement>, sqlx::Error> {
        let query = format!(
            "INSERT INTO achievements (user_id, badge_id, progress)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, badge_id) DO UPDATE
                SET progress = EXCLUDED.progress, updated_at = NOW()
                WHERE achievements.unlocked_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Achievement>(&query)
            .bind(user_id)
            .bind(badge_id)
            .bind(progress)
            .fetch_optional(pool)
            .await
    }

    /// All of a user's achievements joined with their badge, unlocked
    /// first.
    pub async fn for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<UserAchievement>, sqlx::Error> {
        sqlx::query_as::<_, UserAchievement>(
            "SELECT a.id, a.user_id, a.badge_id, b.name AS badge_name, b.category,
                    a.progress, a.unlocked_at, a.created_at
             FROM achievements a
             JOIN badges b ON b.id = a.badge_id
             WHERE a.user_id = $1
             ORDER BY a.unlocked_at DESC NULLS LAST, b.name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
