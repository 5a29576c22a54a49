use thiserror::Error;

/// Unified error type for database operations that application code can handle.
///
/// The engine is read-only against the row store, so the only recoverable
/// category is a missing entity; everything else is surfaced as-is for the
/// caller to treat as "metrics subsystem unavailable".
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            // All other sqlx errors are non-recoverable - convert to anyhow
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
