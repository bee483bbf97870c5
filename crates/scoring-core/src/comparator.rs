// crates/scoring-core/src/comparator.rs
// ============================================================================
// Module: Comparator Evaluation
// Description: Decimal-aware, deterministic comparator evaluation for conditions.
// Purpose: Back the fixed `eq/ne/lt/le/gt/ge/between/in` operator set.
// Dependencies: bigdecimal, serde_json, time
// ============================================================================

//! ## Overview
//! Every condition in a rule document bottoms out in a comparator applied to
//! a resolved variable and a declared literal. Numeric comparisons are
//! decimal-aware (`BigDecimal`, not IEEE-754) so that chained formula and
//! edge-case arithmetic never drifts from what the rule author wrote.
//! Temporal strings are compared by RFC 3339 parsing, falling back to a
//! bare `YYYY-MM-DD` date. Declared inputs in this domain are always
//! present-or-defaulted by the time a comparator runs, so evaluation here is
//! plain `bool` — there is no third "unknown" state, unlike systems that
//! evaluate against possibly-missing external evidence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Number;
use serde_json::Value;
use time::Date;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::EvaluationError;

// ============================================================================
// SECTION: Comparator
// ============================================================================

/// The fixed comparator operator set supported by condition evaluation.
///
/// # Invariants
/// - Closed set; the interpreter dispatches exhaustively on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Inclusive-lower, exclusive-upper interval membership: `[low, high)`.
    Between,
    /// Membership within a declared set of literals.
    In,
    /// Case-insensitive substring membership, for keyword matching against
    /// free-text fields such as a job title.
    Contains,
}

/// Evaluates a comparator against a resolved value and its declared operand.
///
/// For [`Comparator::Between`], `operand` must be a two-element array
/// `[low, high]`. For [`Comparator::In`], `operand` must be an array of
/// candidate values.
///
/// # Errors
///
/// Returns [`EvaluationError::Comparator`] when the operand shape does not
/// match the comparator, or when the two sides are not comparable (e.g.
/// comparing a string to a number with an ordering comparator).
pub fn evaluate_comparator(
    comparator: Comparator,
    actual: &Value,
    operand: &Value,
) -> Result<bool, EvaluationError> {
    match comparator {
        Comparator::Eq => Ok(values_equal(actual, operand)),
        Comparator::Ne => Ok(!values_equal(actual, operand)),
        Comparator::Lt | Comparator::Le | Comparator::Gt | Comparator::Ge => {
            let ordering = ordering_between(actual, operand)?;
            Ok(match comparator {
                Comparator::Lt => ordering.is_lt(),
                Comparator::Le => ordering.is_le(),
                Comparator::Gt => ordering.is_gt(),
                Comparator::Ge => ordering.is_ge(),
                _ => unreachable!("matched above"),
            })
        }
        Comparator::Between => evaluate_between(actual, operand),
        Comparator::In => evaluate_in(actual, operand),
        Comparator::Contains => evaluate_contains(actual, operand),
    }
}

/// Evaluates `contains` as a case-insensitive substring match.
fn evaluate_contains(actual: &Value, operand: &Value) -> Result<bool, EvaluationError> {
    let (Value::String(haystack), Value::String(needle)) = (actual, operand) else {
        return Err(EvaluationError::Comparator {
            detail: "contains requires both the resolved value and the operand to be strings".to_owned(),
        });
    };
    Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
}

/// Evaluates `between` against an inclusive-lower/exclusive-upper pair.
fn evaluate_between(actual: &Value, operand: &Value) -> Result<bool, EvaluationError> {
    let Value::Array(bounds) = operand else {
        return Err(EvaluationError::Comparator {
            detail: "between operand must be a two-element [low, high] array".to_owned(),
        });
    };
    let [low, high] = bounds.as_slice() else {
        return Err(EvaluationError::Comparator {
            detail: format!("between operand must have exactly 2 elements, got {}", bounds.len()),
        });
    };
    let ge_low = ordering_between(actual, low)?.is_ge();
    let lt_high = ordering_between(actual, high)?.is_lt();
    Ok(ge_low && lt_high)
}

/// Evaluates `in` against a declared set of candidate literals.
fn evaluate_in(actual: &Value, operand: &Value) -> Result<bool, EvaluationError> {
    let Value::Array(candidates) = operand else {
        return Err(EvaluationError::Comparator {
            detail: "in operand must be an array of candidate values".to_owned(),
        });
    };
    Ok(candidates.iter().any(|candidate| values_equal(actual, candidate)))
}

/// Compares two JSON values for equality, decimal-aware for numbers.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            matches!(decimal_cmp(left, right), Some(Ordering::Equal))
        }
        _ => left == right,
    }
}

/// Orders two JSON values, decimal-aware for numbers and RFC 3339-aware for
/// strings.
///
/// # Errors
///
/// Returns [`EvaluationError::Comparator`] when the two values are not of a
/// comparable type (two numbers, or two strings parseable as timestamps).
fn ordering_between(left: &Value, right: &Value) -> Result<Ordering, EvaluationError> {
    if let (Some(left_num), Some(right_num)) = (left.as_number(), right.as_number()) {
        return decimal_cmp(left_num, right_num).ok_or_else(|| EvaluationError::Comparator {
            detail: "numeric operand could not be parsed as a decimal".to_owned(),
        });
    }
    if let (Value::String(left), Value::String(right)) = (left, right)
        && let Some(ordering) = temporal_cmp(left, right)
    {
        return Ok(ordering);
    }
    Err(EvaluationError::Comparator {
        detail: format!("values are not ordering-comparable: {left} vs {right}"),
    })
}

/// Orders numeric JSON values using decimal-aware comparison.
fn decimal_cmp(left: &Number, right: &Number) -> Option<Ordering> {
    let left = decimal_from_number(left)?;
    let right = decimal_from_number(right)?;
    Some(left.cmp(&right))
}

/// Parses a JSON number into `BigDecimal` via its stable string rendering.
fn decimal_from_number(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

/// Compares RFC 3339 date-time or date-only strings.
fn temporal_cmp(left: &str, right: &str) -> Option<Ordering> {
    if let (Ok(left), Ok(right)) =
        (OffsetDateTime::parse(left, &Rfc3339), OffsetDateTime::parse(right, &Rfc3339))
    {
        return Some(left.cmp(&right));
    }
    let left = parse_date_only(left)?;
    let right = parse_date_only(right)?;
    Some(left.cmp(&right))
}

/// Parses a bare `YYYY-MM-DD` date.
fn parse_date_only(value: &str) -> Option<Date> {
    let mut parts = value.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = time::Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
