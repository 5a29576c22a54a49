//! Postgres-backed [`MetricStore`] implementation.
//!
//! Definitions live in `metric_definitions`, log rows in `message_logs`.
//! All queries are runtime-checked and fully parameterized; the engine
//! never writes to either table.

use sqlx::PgPool;
use tracing::instrument;

use crate::config::Config;
use crate::db::errors::{DbError, Result};
use crate::db::handlers::logs;
use crate::db::models::metrics::MetricDefinition;
use crate::db::store::MetricStore;
use crate::matcher::RowPredicate;
use crate::types::{ClientId, Scope};

/// The production metric store, backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgMetricStore {
    pool: PgPool,
}

impl PgMetricStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool from configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPool::connect(&config.database.url).await.map_err(DbError::from)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl MetricStore for PgMetricStore {
    #[instrument(skip(self), err)]
    async fn load_active_definitions(&self, client_id: ClientId) -> Result<Vec<MetricDefinition>> {
        let definitions = sqlx::query_as::<_, MetricDefinition>(
            "SELECT id, client_id, name, icon, color, is_calculated, map_to_column, \
                    keywords, formula, prefix, unit, is_active, sort_order \
             FROM metric_definitions \
             WHERE client_id = $1 AND is_active \
             ORDER BY sort_order, name",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(definitions)
    }

    #[instrument(skip(self, predicate), err)]
    async fn count_rows(&self, scope: &Scope, predicate: &RowPredicate) -> Result<i64> {
        logs::count_message_logs(&self.pool, scope, Some(predicate)).await
    }

    #[instrument(skip(self), err)]
    async fn count_total_rows(&self, scope: &Scope) -> Result<i64> {
        logs::count_message_logs(&self.pool, scope, None).await
    }
}
