use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Authorization(String),

    #[error("Business rule violated: {0}")]
    BusinessLogic(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}
