//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use reloop_core::exchange::TrustSnapshot;
use reloop_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    /// Public reputation, 0–5. Recomputed from received ratings.
    pub rating: f64,
    pub total_exchanges: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The trust-related slice used by the initiation guards.
    pub fn trust(&self) -> TrustSnapshot {
        TrustSnapshot {
            is_verified: self.is_verified,
            rating: self.rating,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
}

/// One row of the eco-points leaderboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: DbId,
    pub username: String,
    pub eco_points: i64,
    pub rating: f64,
    pub total_exchanges: i32,
}
