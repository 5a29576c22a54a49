//! Store implementations over PostgreSQL.

pub mod logs;
pub mod metrics;

pub use metrics::PgMetricStore;
