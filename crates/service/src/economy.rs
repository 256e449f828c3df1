//! Eco-points and badge orchestration.
//!
//! Points always flow through the append-only ledger; balances are
//! derived, never stored. Every point-earning event is followed by a
//! badge pass so unlocks land as soon as a threshold is crossed.

use sqlx::PgPool;

use reloop_core::badges::{progress_toward, requirement_met, unlock_reason, RequirementType};
use reloop_core::error::CoreError;
use reloop_core::points::{self, Level};
use reloop_core::types::DbId;
use reloop_db::models::achievement::UserAchievement;
use reloop_db::models::badge::Badge;
use reloop_db::models::ledger::EcoPointsTransaction;
use reloop_db::models::user::{LeaderboardEntry, User};
use reloop_db::repositories::{AchievementRepo, BadgeRepo, UserRepo};

use crate::error::ServiceResult;

/// Result of a manual points award.
#[derive(Debug)]
pub struct AwardOutcome {
    pub transaction: EcoPointsTransaction,
    /// Badges the award pushed over their thresholds.
    pub unlocked: Vec<Badge>,
}

/// Orchestrates the eco-points ledger, badges, and the leaderboard.
#[derive(Clone)]
pub struct EconomyService {
    pool: PgPool,
}

impl EconomyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a positive ledger entry for a user, then run a badge pass.
    pub async fn award_points(
        &self,
        user_id: DbId,
        points: i32,
        reason: &str,
    ) -> ServiceResult<AwardOutcome> {
        points::validate_award(points, reason)?;
        self.load_user(user_id).await?;

        let transaction = UserRepo::append_points(&self.pool, user_id, points, reason).await?;
        tracing::info!(user_id, points, reason, "Eco-points awarded");

        let unlocked = self.check_and_unlock_badges(user_id).await?;
        Ok(AwardOutcome {
            transaction,
            unlocked,
        })
    }

    /// Evaluate every automatic badge against the user's current stats.
    ///
    /// Met requirements unlock exactly once; the unique achievement row
    /// arbitrates concurrent passes, and the unlock reward is paid only by
    /// the pass that actually flipped the row. Unmet requirements record
    /// partial progress. Custom badges are never touched. Returns the
    /// badges unlocked by this call.
    ///
    /// Rewards paid here do not trigger a nested pass; the next
    /// point-earning event picks up anything they enabled.
    pub async fn check_and_unlock_badges(&self, user_id: DbId) -> ServiceResult<Vec<Badge>> {
        let stats = UserRepo::stats(&self.pool, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })?;

        let mut unlocked = Vec::new();
        for badge in BadgeRepo::list_all(&self.pool).await? {
            let requirement = badge.requirement()?;
            if requirement == RequirementType::Custom {
                continue;
            }

            if requirement_met(requirement, badge.requirement_threshold, &stats) {
                if AchievementRepo::try_unlock(&self.pool, user_id, badge.id)
                    .await?
                    .is_some()
                {
                    if badge.eco_points_reward > 0 {
                        UserRepo::append_points(
                            &self.pool,
                            user_id,
                            badge.eco_points_reward,
                            &unlock_reason(&badge.name),
                        )
                        .await?;
                    }
                    tracing::info!(
                        user_id,
                        badge = %badge.name,
                        reward = badge.eco_points_reward,
                        "Badge unlocked"
                    );
                    unlocked.push(badge);
                }
            } else if let Some(progress) =
                progress_toward(requirement, badge.requirement_threshold, &stats)
            {
                AchievementRepo::upsert_progress(&self.pool, user_id, badge.id, progress).await?;
            }
        }

        Ok(unlocked)
    }

    /// A user's achievements (unlocked and in progress), joined with
    /// badge details.
    pub async fn user_achievements(&self, user_id: DbId) -> ServiceResult<Vec<UserAchievement>> {
        self.load_user(user_id).await?;
        Ok(AchievementRepo::for_user(&self.pool, user_id).await?)
    }

    /// The badge catalog.
    pub async fn all_badges(&self) -> ServiceResult<Vec<Badge>> {
        Ok(BadgeRepo::list_all(&self.pool).await?)
    }

    /// A user's full ledger, newest first.
    pub async fn ledger(&self, user_id: DbId) -> ServiceResult<Vec<EcoPointsTransaction>> {
        self.load_user(user_id).await?;
        Ok(UserRepo::transactions(&self.pool, user_id).await?)
    }

    /// A user's derived balance and the level it puts them at.
    pub async fn balance_and_level(&self, user_id: DbId) -> ServiceResult<(i64, Level)> {
        self.load_user(user_id).await?;
        let balance = UserRepo::balance(&self.pool, user_id).await?;
        Ok((balance, Level::for_balance(balance)))
    }

    /// Top users by derived balance.
    pub async fn leaderboard(&self, limit: i64) -> ServiceResult<Vec<LeaderboardEntry>> {
        Ok(UserRepo::leaderboard(&self.pool, limit).await?)
    }

    /// Mark a user verified, enabling them to initiate exchanges.
    pub async fn verify_user(&self, user_id: DbId) -> ServiceResult<User> {
        let user = UserRepo::mark_verified(&self.pool, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })?;
        tracing::info!(user_id, "User verified");
        Ok(user)
    }

    async fn load_user(&self, id: DbId) -> ServiceResult<User> {
        Ok(UserRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id })?)
    }
}
