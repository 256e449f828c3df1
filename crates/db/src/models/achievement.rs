//! Achievement (per-user badge progress) models.

use serde::Serialize;
use sqlx::FromRow;

use reloop_core::types::{DbId, Timestamp};

/// Full achievement row from the `achievements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Achievement {
    pub id: DbId,
    pub user_id: DbId,
    pub badge_id: DbId,
    /// Progress toward the badge threshold, 0–100.
    pub progress: f32,
    pub unlocked_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Achievement {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

/// Achievement joined with its badge, for per-user listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserAchievement {
    pub id: DbId,
    pub user_id: DbId,
    pub badge_id: DbId,
    pub badge_name: String,
    pub category: String,
    pub progress: f32,
    pub unlocked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
