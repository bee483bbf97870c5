// crates/scoring-feedback/src/alerts.rs
// ============================================================================
// Module: Performance Alerts
// Description: Threshold configuration and trigger logic over a
//              PerformanceMetrics snapshot.
// Purpose: Turn a metrics snapshot into data a human or a rule-authoring
//          tool can act on, without ever rewriting a rule document itself.
// Dependencies: crate::metrics
// ============================================================================

//! ## Overview
//! [`evaluate_alerts`] is a pure function: given one window's
//! [`PerformanceMetrics`] and a tool's [`AlertThresholds`], it returns every
//! [`PerformanceAlert`] whose condition holds. Alerts are rows of data, not
//! actions — nothing here retrains or edits a rule document.

use serde::Deserialize;
use serde::Serialize;

use scoring_core::identifiers::RuleVersion;
use scoring_core::identifiers::ToolName;

use crate::metrics::PerformanceMetrics;

/// Per-tool thresholds that govern [`evaluate_alerts`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Minimum feedback entries required before `success_rate_floor` is
    /// evaluated; below this, the sample is too small to act on.
    pub min_feedback_for_success_rate: u64,
    /// Alert when `PerformanceMetrics::success_rate` falls below this,
    /// given at least `min_feedback_for_success_rate` feedback entries.
    pub success_rate_floor: f64,
    /// Alert when `PerformanceMetrics::avg_confidence` falls below this.
    pub confidence_floor: f64,
    /// Alert when decisions minus feedback entries exceeds this many
    /// unfedback decisions (a solicit-feedback signal).
    pub unfedback_decision_ceiling: u64,
    /// The shadow/production match rate this tool is expected to sustain;
    /// there is no rolling baseline stored in the ledger, so an operator
    /// declares it up front.
    pub match_rate_baseline: f64,
    /// Alert when `PerformanceMetrics::shadow_match_rate` falls more than
    /// this far below `match_rate_baseline`.
    pub match_rate_degradation_delta: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_feedback_for_success_rate: 20,
            success_rate_floor: 0.6,
            confidence_floor: 0.5,
            unfedback_decision_ceiling: 100,
            match_rate_baseline: 0.95,
            match_rate_degradation_delta: 0.1,
        }
    }
}

/// A data row describing one degraded condition for one tool/version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PerformanceAlert {
    /// Observed success rate fell below the declared floor.
    SuccessRateBelowFloor {
        /// Tool this alert concerns.
        tool_name: ToolName,
        /// Rule version this alert concerns, when the window is
        /// single-version.
        rule_version: Option<RuleVersion>,
        /// Observed success rate.
        observed: f64,
        /// Declared floor.
        floor: f64,
        /// Feedback sample size the observation is based on.
        feedback_count: u64,
    },
    /// Observed average confidence fell below the declared floor.
    ConfidenceBelowFloor {
        /// Tool this alert concerns.
        tool_name: ToolName,
        /// Rule version this alert concerns, when the window is
        /// single-version.
        rule_version: Option<RuleVersion>,
        /// Observed average confidence.
        observed: f64,
        /// Declared floor.
        floor: f64,
    },
    /// Decisions without feedback exceeded the declared ceiling.
    UnfedbackDecisionsExceedCeiling {
        /// Tool this alert concerns.
        tool_name: ToolName,
        /// Rule version this alert concerns, when the window is
        /// single-version.
        rule_version: Option<RuleVersion>,
        /// Decisions in the window that received no feedback.
        unfedback: u64,
        /// Declared ceiling.
        ceiling: u64,
    },
    /// Shadow/production match rate degraded beyond the declared delta.
    ShadowMatchRateDegraded {
        /// Tool this alert concerns.
        tool_name: ToolName,
        /// Rule version this alert concerns, when the window is
        /// single-version.
        rule_version: Option<RuleVersion>,
        /// Observed shadow match rate.
        observed: f64,
        /// Declared baseline.
        baseline: f64,
        /// Declared acceptable degradation.
        delta: f64,
    },
}

/// Returns every [`PerformanceAlert`] whose condition holds for `metrics`
/// under `thresholds`.
#[must_use]
pub fn evaluate_alerts(metrics: &PerformanceMetrics, thresholds: &AlertThresholds) -> Vec<PerformanceAlert> {
    let mut alerts = Vec::new();

    if metrics.feedback_count >= thresholds.min_feedback_for_success_rate
        && metrics.success_rate < thresholds.success_rate_floor
    {
        alerts.push(PerformanceAlert::SuccessRateBelowFloor {
            tool_name: metrics.tool_name.clone(),
            rule_version: metrics.rule_version.clone(),
            observed: metrics.success_rate,
            floor: thresholds.success_rate_floor,
            feedback_count: metrics.feedback_count,
        });
    }

    if metrics.decision_count > 0 && metrics.avg_confidence < thresholds.confidence_floor {
        alerts.push(PerformanceAlert::ConfidenceBelowFloor {
            tool_name: metrics.tool_name.clone(),
            rule_version: metrics.rule_version.clone(),
            observed: metrics.avg_confidence,
            floor: thresholds.confidence_floor,
        });
    }

    let unfedback = metrics.decision_count.saturating_sub(metrics.feedback_count);
    if unfedback > thresholds.unfedback_decision_ceiling {
        alerts.push(PerformanceAlert::UnfedbackDecisionsExceedCeiling {
            tool_name: metrics.tool_name.clone(),
            rule_version: metrics.rule_version.clone(),
            unfedback,
            ceiling: thresholds.unfedback_decision_ceiling,
        });
    }

    if metrics.shadow_comparison_count > 0
        && metrics.shadow_match_rate < thresholds.match_rate_baseline - thresholds.match_rate_degradation_delta
    {
        alerts.push(PerformanceAlert::ShadowMatchRateDegraded {
            tool_name: metrics.tool_name.clone(),
            rule_version: metrics.rule_version.clone(),
            observed: metrics.shadow_match_rate,
            baseline: thresholds.match_rate_baseline,
            delta: thresholds.match_rate_degradation_delta,
        });
    }

    alerts
}
