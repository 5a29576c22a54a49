use crate::db::errors::DbError;
use thiserror::Error as ThisError;

/// Top-level error type for the metrics engine.
///
/// The failure policy is deliberately two-tiered: per-metric problems
/// (malformed definitions, broken formulas) never surface here - they are
/// logged and the affected metric is skipped or zeroed so one bad metric
/// cannot blank the whole dashboard. Only whole-batch failures (the
/// definition store or row store being unavailable, invalid configuration)
/// propagate, so callers can show "metrics unavailable" instead of
/// silently rendering zeros.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid configuration value or malformed metric definition
    #[error("{message}")]
    Config { message: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type alias for engine operation results
pub type Result<T> = std::result::Result<T, Error>;
