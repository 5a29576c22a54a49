//! Common type definitions shared across the engine.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`ClientId`]: tenant identifier (every metric definition and log row is
//!   partitioned by client)
//! - [`MetricId`]: metric definition identifier
//!
//! [`Scope`] is the filter context for one stats computation: the tenant,
//! plus an optional template and date-range restriction. Every count
//! produced within a single [`compute_metric_stats`] call shares one scope.
//!
//! [`compute_metric_stats`]: crate::stats::MetricsEngine::compute_metric_stats

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Type aliases for IDs
pub type ClientId = Uuid;
pub type MetricId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Inclusive date range restricting which log rows participate in a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The filter context for one stats computation.
///
/// All row counts inside a single [`compute_metric_stats`] call are taken
/// against the same scope, so percentages and calculated metrics are always
/// internally consistent.
///
/// [`compute_metric_stats`]: crate::stats::MetricsEngine::compute_metric_stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Tenant partition key
    pub client_id: ClientId,
    /// Restrict counting to rows for a single message template
    pub template_name: Option<String>,
    /// Restrict counting to rows created within this range
    pub date_range: Option<DateRange>,
}

impl Scope {
    /// Scope covering every log row of a tenant
    pub fn client(client_id: ClientId) -> Self {
        Self {
            client_id,
            template_name: None,
            date_range: None,
        }
    }

    pub fn with_template(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = Some(template_name.into());
        self
    }

    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some(DateRange { start, end });
        self
    }
}
