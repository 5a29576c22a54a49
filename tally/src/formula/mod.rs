//! Safe formula evaluation for calculated metrics.
//!
//! Formulas are tenant-authored arithmetic over other metrics' counts, e.g.
//! `Math.round((delivered / sent) * 100)`. They are parsed into a fixed AST
//! by an allow-list lexer and a recursive-descent parser, then evaluated
//! against a frozen value table. There is no string substitution and no
//! dynamic code path, so hostile formula text cannot execute anything.
//!
//! Failure policy: a formula that cannot be evaluated, for any reason, yields
//! `0` and a warning. One tenant's broken metric must never fail the batch.

mod eval;
mod lexer;
mod parser;

use std::collections::HashMap;

use tracing::warn;

use crate::db::models::metrics::MetricName;

/// The frozen per-batch value table: classification counts keyed by
/// normalized metric name. Calculated metrics read from it, never write.
pub type MetricValues = HashMap<MetricName, f64>;

/// Substrings that indicate an attempt to smuggle code into a formula.
///
/// Consulted only after evaluation has already failed, to log probable
/// injection attempts distinctly from ordinary typos. Never used to reject
/// a formula: a metric legitimately named "Processed" or "Window Clicks"
/// must evaluate, and the closed grammar is what keeps hostile text inert.
const DENIED_PATTERNS: &[&str] = &[
    "=>",
    "eval(",
    "function",
    "import",
    "require",
    "process",
    "global",
    "window",
    "document",
    "__proto__",
    "prototype",
    "constructor",
];

#[derive(Debug, thiserror::Error)]
pub(crate) enum FormulaError {
    #[error("formula length {len} exceeds maximum {max}")]
    TooLong { len: usize, max: usize },
    #[error("disallowed character {0:?}")]
    DisallowedCharacter(char),
    #[error("malformed number literal {0:?}")]
    MalformedNumber(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unknown metric {0:?}")]
    UnknownMetric(String),
    #[error("unknown function {0:?}")]
    UnknownFunction(String),
    #[error("{name} expects {expected} argument(s), got {got}")]
    WrongArity {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("result is not a finite number")]
    NonFinite,
}

/// Evaluate a formula against the value table. Never fails: any error
/// degrades to `0.0` with a warning.
///
/// Finite results are rounded to two decimal places; whole numbers pass
/// through unchanged so counts stay integral.
pub fn evaluate(formula: &str, values: &MetricValues, max_length: usize) -> f64 {
    match try_evaluate(formula, values, max_length) {
        Ok(value) => round_result(value),
        Err(err) => {
            match denied_pattern(formula) {
                Some(pattern) => {
                    warn!(
                        %err,
                        pattern,
                        formula_length = formula.len(),
                        "formula evaluation failed, probable injection attempt, defaulting to 0"
                    );
                }
                None => {
                    warn!(%err, formula_length = formula.len(), "formula evaluation failed, defaulting to 0");
                }
            }
            0.0
        }
    }
}

fn denied_pattern(formula: &str) -> Option<&'static str> {
    let lowered = formula.to_ascii_lowercase();
    DENIED_PATTERNS.iter().find(|p| lowered.contains(**p)).copied()
}

fn try_evaluate(formula: &str, values: &MetricValues, max_length: usize) -> Result<f64, FormulaError> {
    if formula.len() > max_length {
        return Err(FormulaError::TooLong {
            len: formula.len(),
            max: max_length,
        });
    }

    let tokens = lexer::tokenize(formula)?;
    let expr = parser::parse(&tokens)?;
    let value = eval::eval(&expr, values)?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::NonFinite)
    }
}

fn round_result(value: f64) -> f64 {
    if value.fract() == 0.0 {
        value
    } else {
        (value * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 512;

    fn values(pairs: &[(&str, f64)]) -> MetricValues {
        pairs
            .iter()
            .map(|(name, value)| (MetricName::normalize(name), *value))
            .collect()
    }

    #[test]
    fn percentage_formula_from_counts() {
        let vals = values(&[("sent", 10.0), ("delivered", 6.0)]);
        assert_eq!(evaluate("Math.round((delivered / sent) * 100)", &vals, MAX), 60.0);
    }

    #[test]
    fn whole_numbers_pass_through_unrounded() {
        let vals = values(&[("sent", 10.0)]);
        assert_eq!(evaluate("sent * 3", &vals, MAX), 30.0);
    }

    #[test]
    fn fractional_results_round_to_two_decimals() {
        let vals = MetricValues::new();
        assert_eq!(evaluate("1 / 3", &vals, MAX), 0.33);
        assert_eq!(evaluate("2 / 3", &vals, MAX), 0.67);
    }

    #[test]
    fn metric_names_match_whole_identifiers_only() {
        // A metric named "sent" must not be found inside "unsent" or
        // "sentiment"; those are distinct identifiers and thus unknown.
        let vals = values(&[("sent", 10.0)]);
        assert_eq!(evaluate("unsent + 1", &vals, MAX), 0.0);
        assert_eq!(evaluate("sentiment + 1", &vals, MAX), 0.0);
        assert_eq!(evaluate("sent + 1", &vals, MAX), 11.0);
    }

    #[test]
    fn metric_names_overlapping_denied_patterns_still_evaluate() {
        // Legitimate metric names may contain words from the injection
        // watch-list ("Processed" contains "process"); they must evaluate
        // like any other identifier.
        let vals = values(&[
            ("Processed", 5.0),
            ("Imported", 3.0),
            ("Global Reach", 80.0),
            ("Window Clicks", 12.0),
            ("Documents", 7.0),
        ]);
        assert_eq!(evaluate("processed * 2", &vals, MAX), 10.0);
        assert_eq!(evaluate("imported + documents", &vals, MAX), 10.0);
        assert_eq!(evaluate("Math.round(globalreach / 2)", &vals, MAX), 40.0);
        assert_eq!(evaluate("windowclicks - 2", &vals, MAX), 10.0);
        // Hostile text built from the same words still dies in the parser.
        assert_eq!(evaluate("process.exit(1)", &vals, MAX), 0.0);
    }

    #[test]
    fn metric_lookup_is_case_insensitive() {
        let vals = values(&[("Delivery Rate", 95.5)]);
        assert_eq!(evaluate("DeliveryRate", &vals, MAX), 95.5);
        assert_eq!(evaluate("deliveryrate + 0.5", &vals, MAX), 96.0);
    }

    #[test]
    fn injection_attempts_yield_zero_without_panicking() {
        let vals = values(&[("sent", 10.0)]);
        for formula in [
            "eval('1+1')",
            "(() => { while(true){} })()",
            "process.exit(1)",
            "require('fs').readFileSync('/etc/passwd')",
            "constructor.constructor('return 1')()",
            "__proto__.polluted = 1",
            "global.sent",
            "sent; DROP TABLE metric_definitions",
        ] {
            assert_eq!(evaluate(formula, &vals, MAX), 0.0, "formula: {formula}");
        }
    }

    #[test]
    fn division_by_zero_yields_zero() {
        let vals = values(&[("sent", 0.0)]);
        assert_eq!(evaluate("10 / sent", &vals, MAX), 0.0);
        assert_eq!(evaluate("0 / 0", &vals, MAX), 0.0);
    }

    #[test]
    fn over_length_formula_yields_zero() {
        let vals = values(&[("sent", 1.0)]);
        let long = "sent + ".repeat(200) + "sent";
        assert_eq!(evaluate(&long, &vals, MAX), 0.0);
        // The same text is fine under a large enough cap.
        assert_eq!(evaluate(&long, &vals, 10_000), 201.0);
    }

    #[test]
    fn empty_formula_yields_zero() {
        assert_eq!(evaluate("", &MetricValues::new(), MAX), 0.0);
        assert_eq!(evaluate("   ", &MetricValues::new(), MAX), 0.0);
    }

    #[test]
    fn namespace_is_case_insensitive() {
        let vals = values(&[("rate", 2.6)]);
        assert_eq!(evaluate("MATH.ROUND(rate)", &vals, MAX), 3.0);
        assert_eq!(evaluate("math.floor(rate)", &vals, MAX), 2.0);
    }
}
