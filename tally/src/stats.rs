//! The stats orchestrator: turns a tenant's metric definitions into a
//! dashboard-ready batch of stats.
//!
//! Computation is two-phase. Phase one counts log rows for every
//! classification metric against one shared scope, producing a frozen value
//! table. Phase two evaluates calculated metrics against that table, so
//! every formula sees a consistent snapshot regardless of evaluation order.
//!
//! Per-metric failures (malformed definitions, broken formulas) are logged
//! and degrade to a skipped or zeroed metric; store failures abort the batch.

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::db::models::metrics::{MetricDefinition, MetricRule};
use crate::db::store::MetricStore;
use crate::errors::Result;
use crate::formula::{self, MetricValues};
use crate::matcher::RowPredicate;
use crate::types::{MetricId, Scope};

/// One computed metric, ready for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStat {
    pub metric_id: MetricId,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Classification metrics carry a whole-number row count; calculated
    /// metrics carry the formula result, rounded to two decimals.
    pub count: f64,
    /// Whole-number share of all rows in scope. Classification metrics only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
    pub is_calculated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// The metrics engine, generic over its persistence seam.
#[derive(Debug, Clone)]
pub struct MetricsEngine<S> {
    store: S,
    max_formula_length: usize,
    concurrent_counts: bool,
}

impl<S: MetricStore> MetricsEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_formula_length: 512,
            concurrent_counts: true,
        }
    }

    pub fn with_config(store: S, config: &Config) -> Self {
        Self {
            store,
            max_formula_length: config.max_formula_length,
            concurrent_counts: config.concurrent_counts,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compute the full stats batch for one scope.
    ///
    /// Returns classification stats first, then calculated stats, each group
    /// in definition order (`sort_order`, then name), with malformed
    /// definitions skipped. An empty definition set yields an empty batch
    /// without touching the log table.
    #[instrument(skip(self), fields(client_id = %crate::types::abbrev_uuid(&scope.client_id)), err)]
    pub async fn compute_metric_stats(&self, scope: &Scope) -> Result<Vec<MetricStat>> {
        let definitions = self.store.load_active_definitions(scope.client_id).await?;
        if definitions.is_empty() {
            debug!("no active metric definitions");
            return Ok(Vec::new());
        }

        let total_rows = self.store.count_total_rows(scope).await?;

        // Interpret definitions up front so a malformed one is skipped
        // before any counting work happens.
        let mut planned: Vec<(MetricDefinition, Plan)> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            match definition.rule() {
                Ok(MetricRule::Classification { column, keywords }) => {
                    let predicate = RowPredicate::new(column, &keywords);
                    planned.push((definition, Plan::Count(predicate)));
                }
                Ok(MetricRule::Calculated { formula }) => {
                    planned.push((definition, Plan::Formula(formula)));
                }
                Err(err) => {
                    warn!(metric = %definition.name, %err, "skipping malformed metric definition");
                }
            }
        }

        // Phase one: classification counts, index-aligned with `planned`.
        let mut counts: Vec<Option<i64>> = vec![None; planned.len()];
        if self.concurrent_counts {
            let pending: Vec<_> = planned
                .iter()
                .enumerate()
                .filter_map(|(index, (_, plan))| match plan {
                    Plan::Count(predicate) => Some(async move {
                        let count = self.store.count_rows(scope, predicate).await?;
                        Ok::<_, crate::db::errors::DbError>((index, count))
                    }),
                    Plan::Formula(_) => None,
                })
                .collect();
            for (index, count) in try_join_all(pending).await? {
                counts[index] = Some(count);
            }
        } else {
            for (index, (_, plan)) in planned.iter().enumerate() {
                if let Plan::Count(predicate) = plan {
                    counts[index] = Some(self.store.count_rows(scope, predicate).await?);
                }
            }
        }

        // Freeze the value table before any formula runs.
        let values: MetricValues = planned
            .iter()
            .zip(&counts)
            .filter_map(|((definition, _), count)| {
                count.map(|count| (definition.normalized_name(), count as f64))
            })
            .collect();

        // Phase two: evaluate formulas against the frozen table and assemble
        // the batch, classification stats first.
        let mut stats = Vec::with_capacity(planned.len());
        let mut calculated = Vec::new();
        for ((definition, plan), count) in planned.into_iter().zip(counts) {
            match plan {
                Plan::Count(_) => {
                    let count = count.unwrap_or(0);
                    stats.push(stat(definition, count as f64, Some(percentage_of(count, total_rows))));
                }
                Plan::Formula(text) => {
                    let value = formula::evaluate(&text, &values, self.max_formula_length);
                    calculated.push(stat(definition, value, None));
                }
            }
        }
        stats.extend(calculated);

        Ok(stats)
    }
}

enum Plan {
    Count(RowPredicate),
    Formula(String),
}

fn stat(definition: MetricDefinition, count: f64, percentage: Option<i64>) -> MetricStat {
    MetricStat {
        metric_id: definition.id,
        name: definition.name,
        icon: definition.icon,
        color: definition.color,
        count,
        percentage,
        is_calculated: definition.is_calculated,
        prefix: definition.prefix,
        unit: definition.unit,
    }
}

/// Whole-number percentage share, `0` when the denominator is empty.
fn percentage_of(count: i64, total: i64) -> i64 {
    if total > 0 {
        ((count as f64 * 100.0) / total as f64).round() as i64
    } else {
        0
    }
}
