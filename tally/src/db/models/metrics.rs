use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::Error;
use crate::types::{ClientId, MetricId};

/// A log-row column that a classification metric may match against.
///
/// This is a closed set: metric definitions referencing anything else are
/// malformed and skipped at computation time. `StatusCode` is the one
/// numeric column; literal keywords compare against its text representation
/// exactly, without case folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogColumn {
    StatusCode,
    StatusMessage,
    MessageStatus,
    MessageStatusDetailed,
    TemplateName,
    Name,
    Phone,
    MessageId,
}

impl LogColumn {
    /// Parse the stored column identifier (camelCase, as authored by the
    /// dashboard admin UI).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "statusCode" => Some(Self::StatusCode),
            "statusMessage" => Some(Self::StatusMessage),
            "messageStatus" => Some(Self::MessageStatus),
            "messageStatusDetailed" => Some(Self::MessageStatusDetailed),
            "templateName" => Some(Self::TemplateName),
            "name" => Some(Self::Name),
            "phone" => Some(Self::Phone),
            "messageId" => Some(Self::MessageId),
            _ => None,
        }
    }

    /// The column name in the `message_logs` table
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::StatusCode => "status_code",
            Self::StatusMessage => "status_message",
            Self::MessageStatus => "message_status",
            Self::MessageStatusDetailed => "message_status_detailed",
            Self::TemplateName => "template_name",
            Self::Name => "name",
            Self::Phone => "phone",
            Self::MessageId => "message_id",
        }
    }

    /// Whether the column holds integers rather than text
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::StatusCode)
    }
}

impl fmt::Display for LogColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A metric's normalized name: lowercased with all whitespace stripped.
///
/// This is the stable key under which classification counts are stored and
/// under which formulas reference other metrics. Normalization happens once,
/// here, rather than inline at each use site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MetricName(String);

impl MetricName {
    pub fn normalize(raw: &str) -> Self {
        let mut name: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        name.make_ascii_lowercase();
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Allows HashMap<MetricName, _> lookups by the bare identifier text the
// formula parser produces.
impl std::borrow::Borrow<str> for MetricName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tenant-defined metric, as stored in the `metric_definitions` table.
///
/// Exactly one of the two rule variants is populated, selected by
/// `is_calculated`; [`MetricDefinition::rule`] enforces that invariant and
/// is the only supported way to interpret a definition. The engine never
/// mutates definitions - they are created and edited by the tenant admin UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MetricDefinition {
    /// Unique identifier for the metric
    pub id: MetricId,
    /// Tenant partition key
    pub client_id: ClientId,
    /// Display name; also the identifier referenced by formulas after
    /// normalization (see [`MetricName`])
    pub name: String,
    /// Display icon hint for the dashboard
    pub icon: Option<String>,
    /// Display color hint for the dashboard
    pub color: Option<String>,
    /// Discriminator: classification rule vs. calculated formula
    pub is_calculated: bool,
    /// Classification only: which log column the keywords match against
    /// (stored as the camelCase column identifier)
    pub map_to_column: Option<String>,
    /// Classification only: keyword tokens, evaluated as a disjunction
    pub keywords: Option<Vec<String>>,
    /// Calculated only: the arithmetic formula over other metrics' counts
    pub formula: Option<String>,
    /// Calculated only: display prefix (e.g. a currency symbol), never evaluated
    pub prefix: Option<String>,
    /// Calculated only: display unit suffix, never evaluated
    pub unit: Option<String>,
    /// Inactive metrics are excluded from computation entirely
    pub is_active: bool,
    /// Display ordering hint
    pub sort_order: i32,
}

/// The validated, typed form of a metric definition's rule.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricRule {
    /// Count log rows whose `column` matches any of `keywords`
    Classification { column: LogColumn, keywords: Vec<String> },
    /// Evaluate `formula` over the other metrics' computed counts
    Calculated { formula: String },
}

impl MetricDefinition {
    /// The normalized name used as the value-table key and formula identifier
    pub fn normalized_name(&self) -> MetricName {
        MetricName::normalize(&self.name)
    }

    /// Interpret the definition as a typed rule, enforcing the invariant
    /// that exactly one variant is populated.
    ///
    /// A definition that fails here is a configuration error: the caller is
    /// expected to skip the metric and continue the batch.
    pub fn rule(&self) -> Result<MetricRule, Error> {
        if self.is_calculated {
            match self.formula.as_deref() {
                Some(formula) if !formula.trim().is_empty() => Ok(MetricRule::Calculated {
                    formula: formula.to_string(),
                }),
                _ => Err(Error::Config {
                    message: format!("calculated metric {:?} has no formula", self.name),
                }),
            }
        } else {
            let column = match self.map_to_column.as_deref() {
                Some(raw) => LogColumn::parse(raw).ok_or_else(|| Error::Config {
                    message: format!("metric {:?} maps to unknown column {raw:?}", self.name),
                })?,
                None => {
                    return Err(Error::Config {
                        message: format!("metric {:?} has no mapped column", self.name),
                    })
                }
            };
            match &self.keywords {
                Some(keywords) if !keywords.is_empty() => Ok(MetricRule::Classification {
                    column,
                    keywords: keywords.clone(),
                }),
                _ => Err(Error::Config {
                    message: format!("metric {:?} has no keywords", self.name),
                }),
            }
        }
    }
}
