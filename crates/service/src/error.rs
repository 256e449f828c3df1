//! Service-level error type.

use reloop_core::error::CoreError;

/// Error type for orchestrator operations.
///
/// Domain failures are [`CoreError`]s; everything else is a database
/// failure that propagates as fatal. An outer transport layer (out of
/// scope here) maps these to protocol codes.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A domain-level error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

/// Convenience type alias for orchestrator return values.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// The wrapped domain error, if any. Handy in tests.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            ServiceError::Core(core) => Some(core),
            ServiceError::Database(_) => None,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    /// Classify a sqlx error.
    ///
    /// PostgreSQL unique violations (code 23505) on our `uq_`-prefixed
    /// constraints are domain conflicts, notably the partial unique index
    /// that forbids two active exchanges for one item and the one
    /// achievement per (user, badge) constraint. Everything else is a
    /// fatal database failure.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return ServiceError::Core(CoreError::Conflict(format!(
                        "Duplicate value violates unique constraint: {constraint}"
                    )));
                }
            }
        }
        ServiceError::Database(err)
    }
}
