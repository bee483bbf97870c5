// crates/scoring-feedback/src/metrics.rs
// ============================================================================
// Module: Performance Metrics
// Description: Per-(tool, rule_version, window) calibration and drift
//              metrics computed from decision and feedback records.
// Purpose: Give the analyzer a pure function from ledger reads to a typed
//          metrics snapshot, independent of scheduling or alert thresholds.
// Dependencies: scoring_core::ledger
// ============================================================================

//! ## Overview
//! [`compute_metrics`] takes every [`DecisionRecord`] and [`FeedbackRecord`]
//! for one tool's window and folds them into a [`PerformanceMetrics`]
//! snapshot: success rate, average confidence, average latency, average
//! outcome value, an outcome-type breakdown, and a calibration table
//! bucketing decisions by their declared confidence against the feedback
//! they actually received.

use std::collections::BTreeMap;

use scoring_core::identifiers::RuleVersion;
use scoring_core::identifiers::ToolName;
use scoring_core::ledger::DecisionRecord;
use scoring_core::ledger::FeedbackOutcome;
use scoring_core::ledger::FeedbackRecord;
use scoring_core::time::Timestamp;
use serde::Deserialize;
use serde::Serialize;

/// Number of equal-width buckets the calibration table divides `[0, 1]`
/// confidence into.
const CALIBRATION_BUCKET_COUNT: usize = 5;

/// One bucket of the calibration table: decisions whose declared
/// confidence fell in `[confidence_low, confidence_high)`, and the
/// fraction of their feedback that was `Accepted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Inclusive lower bound of this bucket's confidence range.
    pub confidence_low: f64,
    /// Exclusive upper bound of this bucket's confidence range (`1.0`
    /// inclusive in the last bucket).
    pub confidence_high: f64,
    /// Decisions whose confidence fell in this bucket.
    pub decision_count: u64,
    /// Fraction of this bucket's feedback that was `Accepted`; `0.0` when
    /// the bucket received no feedback.
    pub observed_success_rate: f64,
}

/// A calibration/drift snapshot for one `(tool, rule_version, window)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Tool this snapshot covers.
    pub tool_name: ToolName,
    /// Rule version decisions in this snapshot were produced under. `None`
    /// when the window spans more than one version.
    pub rule_version: Option<RuleVersion>,
    /// Start of the analysis window, inclusive.
    pub window_start: Timestamp,
    /// End of the analysis window, the instant the analyzer ran.
    pub window_end: Timestamp,
    /// Total decisions logged in the window.
    pub decision_count: u64,
    /// Feedback entries received for decisions in the window.
    pub feedback_count: u64,
    /// Fraction of feedback that was `Accepted`.
    pub success_rate: f64,
    /// Mean of each decision's declared `confidence` field, when present.
    pub avg_confidence: f64,
    /// Mean primary evaluation latency, in milliseconds.
    pub avg_latency_ms: f64,
    /// Mean of each feedback entry's declared `value` field, when present.
    pub avg_outcome_value: f64,
    /// Count of feedback entries by outcome type.
    pub outcome_breakdown: BTreeMap<String, u64>,
    /// Calibration table, ordered by ascending confidence range.
    pub calibration: Vec<CalibrationBucket>,
    /// Decisions that shipped a shadow result alongside the primary one.
    pub shadow_comparison_count: u64,
    /// Fraction of `shadow_comparison_count` whose shadow result's
    /// top-level scalar fields matched the primary result.
    pub shadow_match_rate: f64,
}

/// Computes a [`PerformanceMetrics`] snapshot from one tool's decisions and
/// feedback in a window.
///
/// `decisions` and `feedback` must already be scoped to `tool_name` and the
/// window; this function performs no filtering of its own.
#[must_use]
pub fn compute_metrics(
    tool_name: &ToolName,
    decisions: &[DecisionRecord],
    feedback: &[FeedbackRecord],
    window_start: Timestamp,
    window_end: Timestamp,
) -> PerformanceMetrics {
    let rule_version = single_rule_version(decisions);
    let decision_count = decisions.len() as u64;

    let confidences: Vec<f64> = decisions.iter().filter_map(confidence_of).collect();
    let avg_confidence = average(&confidences);

    let latencies: Vec<f64> = decisions.iter().map(|d| d.latency_ms as f64).collect();
    let avg_latency_ms = average(&latencies);

    let outcome_values: Vec<f64> = feedback.iter().filter_map(outcome_value_of).collect();
    let avg_outcome_value = average(&outcome_values);

    let mut outcome_breakdown = BTreeMap::new();
    let mut accepted = 0u64;
    for entry in feedback {
        *outcome_breakdown.entry(outcome_label(entry.outcome).to_string()).or_insert(0) += 1;
        if entry.outcome == FeedbackOutcome::Accepted {
            accepted += 1;
        }
    }
    let feedback_count = feedback.len() as u64;
    let success_rate = if feedback_count == 0 { 0.0 } else { accepted as f64 / feedback_count as f64 };

    let calibration = calibration_table(decisions, feedback);

    let shadow_comparisons: Vec<bool> = decisions
        .iter()
        .filter_map(|d| d.shadow_result.as_ref().map(|shadow| results_match(&d.result, shadow)))
        .collect();
    let shadow_comparison_count = shadow_comparisons.len() as u64;
    let shadow_match_rate = if shadow_comparisons.is_empty() {
        1.0
    } else {
        shadow_comparisons.iter().filter(|matched| **matched).count() as f64 / shadow_comparisons.len() as f64
    };

    PerformanceMetrics {
        tool_name: tool_name.clone(),
        rule_version,
        window_start,
        window_end,
        decision_count,
        feedback_count,
        success_rate,
        avg_confidence,
        avg_latency_ms,
        avg_outcome_value,
        outcome_breakdown,
        calibration,
        shadow_comparison_count,
        shadow_match_rate,
    }
}

/// Returns `Some(version)` when every decision shares one rule version.
fn single_rule_version(decisions: &[DecisionRecord]) -> Option<RuleVersion> {
    let first = decisions.first()?.rule_version.clone();
    decisions.iter().all(|d| d.rule_version == first).then_some(first)
}

/// Extracts a decision's declared `confidence` field, when present and
/// numeric.
fn confidence_of(decision: &DecisionRecord) -> Option<f64> {
    decision.result.get("confidence").and_then(serde_json::Value::as_f64)
}

/// Extracts a feedback entry's declared `value` field, when present and
/// numeric.
fn outcome_value_of(entry: &FeedbackRecord) -> Option<f64> {
    entry.detail.get("value").and_then(serde_json::Value::as_f64)
}

/// Maps a [`FeedbackOutcome`] to its calibration-table label.
fn outcome_label(outcome: FeedbackOutcome) -> &'static str {
    match outcome {
        FeedbackOutcome::Accepted => "accepted",
        FeedbackOutcome::Rejected => "rejected",
        FeedbackOutcome::Overridden => "overridden",
    }
}

/// Averages a slice of samples, returning `0.0` for an empty slice.
fn average(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

/// Builds the calibration table: decisions bucketed by declared
/// confidence, each bucket's actual acceptance rate among its feedback.
fn calibration_table(decisions: &[DecisionRecord], feedback: &[FeedbackRecord]) -> Vec<CalibrationBucket> {
    let feedback_by_decision: BTreeMap<&str, Vec<&FeedbackRecord>> = feedback.iter().fold(BTreeMap::new(), |mut acc, f| {
        acc.entry(f.decision_id.as_str()).or_default().push(f);
        acc
    });

    let mut buckets: Vec<CalibrationBucket> = (0 .. CALIBRATION_BUCKET_COUNT)
        .map(|index| {
            #[allow(clippy::cast_precision_loss, reason = "bucket count is a small fixed constant")]
            let low = index as f64 / CALIBRATION_BUCKET_COUNT as f64;
            #[allow(clippy::cast_precision_loss, reason = "bucket count is a small fixed constant")]
            let high = (index + 1) as f64 / CALIBRATION_BUCKET_COUNT as f64;
            CalibrationBucket { confidence_low: low, confidence_high: high, decision_count: 0, observed_success_rate: 0.0 }
        })
        .collect();

    let mut accepted_counts = vec![0u64; CALIBRATION_BUCKET_COUNT];
    let mut feedback_counts = vec![0u64; CALIBRATION_BUCKET_COUNT];

    for decision in decisions {
        let Some(confidence) = confidence_of(decision) else { continue };
        let index = bucket_index(confidence);
        buckets[index].decision_count += 1;

        if let Some(entries) = feedback_by_decision.get(decision.decision_id.as_str()) {
            for entry in entries {
                feedback_counts[index] += 1;
                if entry.outcome == FeedbackOutcome::Accepted {
                    accepted_counts[index] += 1;
                }
            }
        }
    }

    for (index, bucket) in buckets.iter_mut().enumerate() {
        if feedback_counts[index] > 0 {
            bucket.observed_success_rate = accepted_counts[index] as f64 / feedback_counts[index] as f64;
        }
    }

    buckets
}

/// Maps a confidence value in `[0, 1]` to its calibration bucket index,
/// clamping out-of-range values to the nearest edge bucket.
#[allow(clippy::cast_possible_truncation, reason = "confidence is clamped to [0,1] before the cast")]
#[allow(clippy::cast_sign_loss, reason = "confidence is clamped to a non-negative range before the cast")]
fn bucket_index(confidence: f64) -> usize {
    let clamped = confidence.clamp(0.0, 0.999_999);
    (clamped * CALIBRATION_BUCKET_COUNT as f64) as usize
}

/// Compares two tool results' scalar top-level fields for equality,
/// treating numeric fields with differing types (e.g. `1` vs `1.0`) as
/// equal when their `f64` values match.
fn results_match(primary: &serde_json::Value, shadow: &serde_json::Value) -> bool {
    let (Some(primary), Some(shadow)) = (primary.as_object(), shadow.as_object()) else {
        return primary == shadow;
    };
    primary.iter().all(|(key, value)| match (value, shadow.get(key)) {
        (serde_json::Value::Number(left), Some(serde_json::Value::Number(right))) => left.as_f64() == right.as_f64(),
        (left, Some(right)) => left == right,
        (_, None) => false,
    })
}
