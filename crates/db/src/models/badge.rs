//! Badge reference-data model.

use serde::Serialize;
use sqlx::FromRow;

use reloop_core::badges::RequirementType;
use reloop_core::error::CoreError;
use reloop_core::types::{DbId, Timestamp};

/// Full badge row from the `badges` table. Immutable reference data.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Badge {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub requirement_type: String,
    pub requirement_threshold: f64,
    pub eco_points_reward: i32,
    pub created_at: Timestamp,
}

impl Badge {
    /// Parse the stored requirement type into the closed enum.
    pub fn requirement(&self) -> Result<RequirementType, CoreError> {
        RequirementType::parse(&self.requirement_type)
    }
}
