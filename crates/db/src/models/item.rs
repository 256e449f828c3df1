//! Item entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use reloop_core::error::CoreError;
use reloop_core::exchange::ItemStatus;
use reloop_core::types::{DbId, Timestamp};

/// Full item row from the `items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Item {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Item {
    /// Parse the stored status into the closed enum.
    pub fn status(&self) -> Result<ItemStatus, CoreError> {
        ItemStatus::parse(&self.status)
    }
}

/// DTO for creating a new item (posted as available).
#[derive(Debug, Deserialize)]
pub struct CreateItem {
    pub owner_id: DbId,
    pub title: String,
    pub description: Option<String>,
}
