//! Repository for the `badges` reference table.

use sqlx::PgPool;

use reloop_core::types::DbId;

use crate::models::badge::Badge;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, category, requirement_type, \
    requirement_threshold, eco_points_reward, created_at";

/// Read-only access to badge definitions (seeded by migration).
pub struct BadgeRepo;

impl BadgeRepo {
    /// All badge definitions, by name.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Badge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM badges ORDER BY name");
        sqlx::query_as::<_, Badge>(&query).fetch_all(pool).await
    }

    /// Find a badge by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Badge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM badges WHERE id = $1");
        sqlx::query_as::<_, Badge>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a badge by its unique name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Badge>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM badges WHERE name = $1");
        sqlx::query_as::<_, Badge>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }
}
