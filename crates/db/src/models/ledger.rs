//! Eco-points ledger entity model.

use serde::Serialize;
use sqlx::FromRow;

use reloop_core::types::{DbId, Timestamp};

/// One append-only row of the eco-points ledger.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EcoPointsTransaction {
    pub id: DbId,
    pub user_id: DbId,
    pub points: i32,
    pub reason: String,
    pub created_at: Timestamp,
}
