use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::models::metrics::LogColumn;
use crate::types::ClientId;

/// One message-log row, restricted to the fields the matcher can see plus
/// the scoping fields (tenant, template, timestamp). The engine never
/// mutates rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LogRow {
    pub client_id: ClientId,
    pub created_at: DateTime<Utc>,
    pub status_code: Option<i32>,
    pub status_message: Option<String>,
    pub message_status: Option<String>,
    pub message_status_detailed: Option<String>,
    pub template_name: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub message_id: Option<String>,
}

impl LogRow {
    /// The value of a matchable column as text, or `None` when the column
    /// is null. The numeric `status_code` column renders via its text
    /// representation, so `$empty` can never match a non-null status code.
    pub fn column_text(&self, column: LogColumn) -> Option<Cow<'_, str>> {
        match column {
            LogColumn::StatusCode => self.status_code.map(|code| Cow::Owned(code.to_string())),
            LogColumn::StatusMessage => self.status_message.as_deref().map(Cow::Borrowed),
            LogColumn::MessageStatus => self.message_status.as_deref().map(Cow::Borrowed),
            LogColumn::MessageStatusDetailed => self.message_status_detailed.as_deref().map(Cow::Borrowed),
            LogColumn::TemplateName => self.template_name.as_deref().map(Cow::Borrowed),
            LogColumn::Name => self.name.as_deref().map(Cow::Borrowed),
            LogColumn::Phone => self.phone.as_deref().map(Cow::Borrowed),
            LogColumn::MessageId => self.message_id.as_deref().map(Cow::Borrowed),
        }
    }
}
