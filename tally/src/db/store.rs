//! The persistence seam consumed by the stats orchestrator.
//!
//! Everything the engine needs from the outside world is behind
//! [`MetricStore`]: loading the tenant's metric configuration and counting
//! log rows within a scope. The production implementation is
//! [`PgMetricStore`](crate::db::handlers::PgMetricStore); tests and
//! embedders without a database use the in-memory store from
//! [`crate::test_utils`].
//!
//! Contract notes:
//!
//! - `load_active_definitions` returns only active definitions, ordered by
//!   `sort_order`.
//! - `count_rows` / `count_total_rows` are read-only; keyword literals in
//!   the predicate are data and must never be interpolated into query text.

use crate::db::errors::Result;
use crate::db::models::metrics::MetricDefinition;
use crate::matcher::RowPredicate;
use crate::types::{ClientId, Scope};

#[async_trait::async_trait]
pub trait MetricStore: Send + Sync {
    /// Load the tenant's active metric definitions, ordered by `sort_order`
    async fn load_active_definitions(&self, client_id: ClientId) -> Result<Vec<MetricDefinition>>;

    /// Count log rows in scope matching the keyword predicate
    async fn count_rows(&self, scope: &Scope, predicate: &RowPredicate) -> Result<i64>;

    /// Count all log rows in scope (the percentage denominator)
    async fn count_total_rows(&self, scope: &Scope) -> Result<i64>;
}
