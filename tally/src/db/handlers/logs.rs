//! Compilation of scope filters and keyword predicates into parameterized
//! `COUNT(*)` queries over the `message_logs` table.
//!
//! Keyword values are tenant-authored and untrusted: every literal goes
//! through `push_bind`, so the query text only ever contains column names
//! from the closed [`LogColumn`](crate::db::models::metrics::LogColumn) set
//! and `$n` placeholders.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use crate::db::errors::Result;
use crate::matcher::{KeywordToken, RowPredicate};
use crate::types::Scope;

/// Append the tenant/template/date-range filters shared by every count.
pub(crate) fn push_scope_filters(builder: &mut QueryBuilder<'_, Postgres>, scope: &Scope) {
    builder.push(" WHERE client_id = ").push_bind(scope.client_id);
    if let Some(template_name) = &scope.template_name {
        builder.push(" AND template_name = ").push_bind(template_name.clone());
    }
    if let Some(range) = &scope.date_range {
        builder.push(" AND created_at >= ").push_bind(range.start);
        builder.push(" AND created_at <= ").push_bind(range.end);
    }
}

/// Append the keyword disjunction for one classification rule.
///
/// A wildcard collapses the rule to the bare scope count; an empty token
/// list matches nothing. Text literals compare case-insensitively via
/// `LOWER()`; the numeric `status_code` column compares on its exact text
/// representation.
pub(crate) fn push_keyword_filter(builder: &mut QueryBuilder<'_, Postgres>, predicate: &RowPredicate) {
    if predicate.is_match_all() {
        return;
    }
    if predicate.tokens().is_empty() {
        builder.push(" AND FALSE");
        return;
    }

    let column = predicate.column();
    builder.push(" AND (");
    for (i, token) in predicate.tokens().iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        match token {
            // is_match_all() returned false, so no wildcard is present
            KeywordToken::Wildcard => {
                builder.push("TRUE");
            }
            KeywordToken::NotNull => {
                builder.push(column.sql_name()).push(" IS NOT NULL");
            }
            KeywordToken::Null => {
                builder.push(column.sql_name()).push(" IS NULL");
            }
            KeywordToken::Empty => {
                if column.is_numeric() {
                    builder.push(column.sql_name()).push("::text = ''");
                } else {
                    builder.push(column.sql_name()).push(" = ''");
                }
            }
            KeywordToken::Literal(keyword) => {
                if column.is_numeric() {
                    builder.push(column.sql_name()).push("::text = ").push_bind(keyword.clone());
                } else {
                    builder
                        .push("LOWER(")
                        .push(column.sql_name())
                        .push(") = ")
                        .push_bind(keyword.to_lowercase());
                }
            }
        }
    }
    builder.push(")");
}

/// Count `message_logs` rows in scope, optionally restricted to a keyword
/// predicate.
#[instrument(skip(pool, predicate), err)]
pub(crate) async fn count_message_logs(pool: &PgPool, scope: &Scope, predicate: Option<&RowPredicate>) -> Result<i64> {
    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM message_logs");
    push_scope_filters(&mut builder, scope);
    if let Some(predicate) = predicate {
        push_keyword_filter(&mut builder, predicate);
    }
    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}
