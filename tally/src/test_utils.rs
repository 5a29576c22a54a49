//! In-memory store and fixture builders for tests and embedders without a
//! database.
//!
//! [`InMemoryMetricStore`] evaluates scopes and predicates directly against
//! owned rows, mirroring the Postgres store's semantics (see
//! [`crate::db::handlers::logs`]) without any SQL.

use anyhow::anyhow;

use crate::db::errors::{DbError, Result};
use crate::db::models::logs::LogRow;
use crate::db::models::metrics::MetricDefinition;
use crate::db::store::MetricStore;
use crate::matcher::RowPredicate;
use crate::types::{ClientId, Scope};

#[derive(Debug, Clone, Default)]
pub struct InMemoryMetricStore {
    definitions: Vec<MetricDefinition>,
    rows: Vec<LogRow>,
    unavailable: bool,
}

impl InMemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_definition(&mut self, definition: MetricDefinition) {
        self.definitions.push(definition);
    }

    pub fn add_row(&mut self, row: LogRow) {
        self.rows.push(row);
    }

    /// Make every store operation fail, to exercise batch-abort paths.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            Err(DbError::Other(anyhow!("store unavailable")))
        } else {
            Ok(())
        }
    }

    fn in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a LogRow> {
        self.rows.iter().filter(move |row| {
            row.client_id == scope.client_id
                && scope
                    .template_name
                    .as_ref()
                    .is_none_or(|template| row.template_name.as_ref() == Some(template))
                && scope
                    .date_range
                    .is_none_or(|range| row.created_at >= range.start && row.created_at <= range.end)
        })
    }
}

#[async_trait::async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn load_active_definitions(&self, client_id: ClientId) -> Result<Vec<MetricDefinition>> {
        self.check_available()?;
        let mut definitions: Vec<_> = self
            .definitions
            .iter()
            .filter(|def| def.client_id == client_id && def.is_active)
            .cloned()
            .collect();
        definitions.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(definitions)
    }

    async fn count_rows(&self, scope: &Scope, predicate: &RowPredicate) -> Result<i64> {
        self.check_available()?;
        Ok(self.in_scope(scope).filter(|row| predicate.matches(row)).count() as i64)
    }

    async fn count_total_rows(&self, scope: &Scope) -> Result<i64> {
        self.check_available()?;
        Ok(self.in_scope(scope).count() as i64)
    }
}

/// A classification metric definition fixture.
pub fn classification(
    client_id: ClientId,
    name: &str,
    column: &str,
    keywords: &[&str],
    sort_order: i32,
) -> MetricDefinition {
    MetricDefinition {
        id: uuid::Uuid::new_v4(),
        client_id,
        name: name.to_string(),
        icon: None,
        color: None,
        is_calculated: false,
        map_to_column: Some(column.to_string()),
        keywords: Some(keywords.iter().map(|k| k.to_string()).collect()),
        formula: None,
        prefix: None,
        unit: None,
        is_active: true,
        sort_order,
    }
}

/// A calculated metric definition fixture.
pub fn calculated(client_id: ClientId, name: &str, formula: &str, sort_order: i32) -> MetricDefinition {
    MetricDefinition {
        id: uuid::Uuid::new_v4(),
        client_id,
        name: name.to_string(),
        icon: None,
        color: None,
        is_calculated: true,
        map_to_column: None,
        keywords: None,
        formula: Some(formula.to_string()),
        prefix: None,
        unit: None,
        is_active: true,
        sort_order,
    }
}

/// A log-row fixture: all matchable columns null, customized via the closure.
pub fn log_row(client_id: ClientId, customize: impl FnOnce(&mut LogRow)) -> LogRow {
    let mut row = LogRow {
        client_id,
        created_at: chrono::Utc::now(),
        status_code: None,
        status_message: None,
        message_status: None,
        message_status_detailed: None,
        template_name: None,
        name: None,
        phone: None,
        message_id: None,
    };
    customize(&mut row);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::metrics::LogColumn;
    use chrono::{Duration, Utc};

    #[test_log::test(tokio::test)]
    async fn inactive_definitions_are_not_loaded() {
        let client_id = ClientId::new_v4();
        let mut store = InMemoryMetricStore::new();
        let mut inactive = classification(client_id, "Old", "messageStatus", &["x"], 0);
        inactive.is_active = false;
        store.add_definition(inactive);
        store.add_definition(classification(client_id, "Sent", "messageStatus", &["*"], 1));

        let defs = store.load_active_definitions(client_id).await.unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "Sent");
    }

    #[test_log::test(tokio::test)]
    async fn definitions_load_in_sort_order() {
        let client_id = ClientId::new_v4();
        let mut store = InMemoryMetricStore::new();
        store.add_definition(classification(client_id, "B", "messageStatus", &["b"], 1));
        store.add_definition(classification(client_id, "A", "messageStatus", &["a"], 0));
        store.add_definition(classification(client_id, "C", "messageStatus", &["c"], 1));

        let names: Vec<_> = store
            .load_active_definitions(client_id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test_log::test(tokio::test)]
    async fn date_range_scoping_is_inclusive() {
        let client_id = ClientId::new_v4();
        let now = Utc::now();
        let mut store = InMemoryMetricStore::new();
        for offset in [-2, -1, 0, 1, 2] {
            store.add_row(log_row(client_id, |row| {
                row.created_at = now + Duration::days(offset);
            }));
        }

        let scope = Scope::client(client_id).with_date_range(now - Duration::days(1), now + Duration::days(1));
        assert_eq!(store.count_total_rows(&scope).await.unwrap(), 3);
    }

    #[test_log::test(tokio::test)]
    async fn counting_respects_predicate_and_tenant() {
        let client_id = ClientId::new_v4();
        let other = ClientId::new_v4();
        let mut store = InMemoryMetricStore::new();
        store.add_row(log_row(client_id, |row| {
            row.message_status = Some("delivered".to_string());
        }));
        store.add_row(log_row(other, |row| {
            row.message_status = Some("delivered".to_string());
        }));

        let predicate = RowPredicate::new(LogColumn::MessageStatus, &["delivered".to_string()]);
        let count = store.count_rows(&Scope::client(client_id), &predicate).await.unwrap();
        assert_eq!(count, 1);
    }
}
