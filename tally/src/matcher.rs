//! Row Matcher: keyword tokens and the structured row predicate.
//!
//! A classification metric's rule is a (column, keyword-list) pair. Each
//! keyword is parsed once into a [`KeywordToken`]; the resulting
//! [`RowPredicate`] is a pure description of the rule that two consumers
//! share:
//!
//! - the Postgres store compiles it into a parameterized `COUNT(*)` query
//!   (see [`crate::db::handlers::logs`]) - keyword literals are always bind
//!   parameters, never SQL text;
//! - the in-memory store and the test suite evaluate it directly against
//!   [`LogRow`]s via [`RowPredicate::matches`].
//!
//! Tokens combine as a disjunction: a row counts if it matches ANY token.
//! A wildcard token dominates the whole rule.

use serde::{Deserialize, Serialize};

use crate::db::models::logs::LogRow;
use crate::db::models::metrics::LogColumn;

/// One parsed keyword from a classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordToken {
    /// `*` - matches every row in scope; dominates all other tokens
    Wildcard,
    /// `$not_null` - the column holds any non-null value (empty string included)
    NotNull,
    /// `$null` (or the legacy bare `null`, case-insensitive) - the column is null
    Null,
    /// `$empty` - the column's text representation is the empty string
    Empty,
    /// Any other keyword: literal comparison against the column value.
    /// Original casing is preserved for echoing; text columns compare
    /// case-insensitively, the numeric column compares exactly.
    Literal(String),
}

impl KeywordToken {
    pub fn parse(raw: &str) -> Self {
        if raw == "*" {
            KeywordToken::Wildcard
        } else if raw.eq_ignore_ascii_case("$not_null") {
            KeywordToken::NotNull
        } else if raw.eq_ignore_ascii_case("$null") || raw.eq_ignore_ascii_case("null") {
            KeywordToken::Null
        } else if raw.eq_ignore_ascii_case("$empty") {
            KeywordToken::Empty
        } else {
            KeywordToken::Literal(raw.to_string())
        }
    }
}

/// A classification rule in evaluable form: which column to inspect and the
/// token disjunction to test it against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowPredicate {
    column: LogColumn,
    tokens: Vec<KeywordToken>,
}

impl RowPredicate {
    pub fn new(column: LogColumn, keywords: &[String]) -> Self {
        Self {
            column,
            tokens: keywords.iter().map(|raw| KeywordToken::parse(raw)).collect(),
        }
    }

    pub fn column(&self) -> LogColumn {
        self.column
    }

    pub fn tokens(&self) -> &[KeywordToken] {
        &self.tokens
    }

    /// Whether the rule contains a wildcard and therefore counts every row
    /// in scope, regardless of other tokens.
    pub fn is_match_all(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, KeywordToken::Wildcard))
    }

    /// Pure evaluation of the predicate against one row. An empty token
    /// list matches nothing.
    pub fn matches(&self, row: &LogRow) -> bool {
        if self.is_match_all() {
            return true;
        }
        self.tokens.iter().any(|token| self.token_matches(token, row))
    }

    fn token_matches(&self, token: &KeywordToken, row: &LogRow) -> bool {
        let value = row.column_text(self.column);
        match token {
            KeywordToken::Wildcard => true,
            KeywordToken::NotNull => value.is_some(),
            KeywordToken::Null => value.is_none(),
            KeywordToken::Empty => matches!(value.as_deref(), Some("")),
            KeywordToken::Literal(keyword) => match value.as_deref() {
                None => false,
                Some(v) if self.column.is_numeric() => v == keyword,
                Some(v) => v.eq_ignore_ascii_case(keyword),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn row(message_status: Option<&str>, status_code: Option<i32>) -> LogRow {
        LogRow {
            client_id: Uuid::nil(),
            created_at: Utc::now(),
            status_code,
            status_message: None,
            message_status: message_status.map(str::to_string),
            message_status_detailed: None,
            template_name: None,
            name: None,
            phone: None,
            message_id: None,
        }
    }

    fn predicate(column: LogColumn, keywords: &[&str]) -> RowPredicate {
        RowPredicate::new(column, &keywords.iter().map(|k| k.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn token_parsing_recognizes_specials() {
        assert_eq!(KeywordToken::parse("*"), KeywordToken::Wildcard);
        assert_eq!(KeywordToken::parse("$not_null"), KeywordToken::NotNull);
        assert_eq!(KeywordToken::parse("$null"), KeywordToken::Null);
        assert_eq!(KeywordToken::parse("null"), KeywordToken::Null);
        assert_eq!(KeywordToken::parse("NULL"), KeywordToken::Null);
        assert_eq!(KeywordToken::parse("$empty"), KeywordToken::Empty);
        assert_eq!(KeywordToken::parse("delivered"), KeywordToken::Literal("delivered".to_string()));
    }

    #[test]
    fn wildcard_dominates_other_keywords() {
        let p = predicate(LogColumn::MessageStatus, &["nonsense", "*"]);
        assert!(p.is_match_all());
        assert!(p.matches(&row(None, None)));
        assert!(p.matches(&row(Some("anything"), None)));
    }

    #[test]
    fn null_empty_not_null_partition() {
        let rows = [row(None, None), row(Some(""), None), row(Some("sent"), None)];
        let null = predicate(LogColumn::MessageStatus, &["$null"]);
        let not_null = predicate(LogColumn::MessageStatus, &["$not_null"]);
        let empty = predicate(LogColumn::MessageStatus, &["$empty"]);

        let count = |p: &RowPredicate| rows.iter().filter(|r| p.matches(r)).count();
        assert_eq!(count(&null), 1);
        assert_eq!(count(&not_null), 2);
        assert_eq!(count(&null) + count(&not_null), rows.len());
        // Empty string is non-null: $empty rows are a subset of $not_null rows
        assert_eq!(count(&empty), 1);
        assert!(rows.iter().filter(|r| empty.matches(r)).all(|r| not_null.matches(r)));
    }

    #[test]
    fn text_comparison_is_case_insensitive() {
        let r = row(Some("Delivered"), None);
        for keyword in ["Delivered", "delivered", "DELIVERED"] {
            assert!(predicate(LogColumn::MessageStatus, &[keyword]).matches(&r));
        }
    }

    #[test]
    fn status_code_matches_exactly() {
        let p = predicate(LogColumn::StatusCode, &["200"]);
        assert!(p.matches(&row(None, Some(200))));
        assert!(!p.matches(&row(None, Some(2000))));
        assert!(!p.matches(&row(None, Some(20))));
        assert!(!p.matches(&row(None, None)));
    }

    #[test]
    fn multiple_literals_combine_with_or() {
        let p = predicate(LogColumn::MessageStatus, &["sent", "delivered"]);
        assert!(p.matches(&row(Some("sent"), None)));
        assert!(p.matches(&row(Some("delivered"), None)));
        assert!(!p.matches(&row(Some("read"), None)));
    }

    #[test]
    fn empty_token_list_matches_nothing() {
        let p = RowPredicate::new(LogColumn::MessageStatus, &[]);
        assert!(!p.matches(&row(Some("sent"), None)));
        assert!(!p.matches(&row(None, None)));
    }

    #[test]
    fn empty_keyword_on_numeric_column_never_matches_values() {
        let p = predicate(LogColumn::StatusCode, &["$empty"]);
        assert!(!p.matches(&row(None, Some(0))));
        assert!(!p.matches(&row(None, None)));
    }
}
