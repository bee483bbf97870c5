// crates/scoring-feedback/src/analyzer.rs
// ============================================================================
// Module: Feedback Analyzer
// Description: Reads the ledger, computes metrics and alerts, on demand or
//              on a recurring schedule.
// Purpose: Close the loop from logged decisions back to an operator- or
//          rule-authoring-tool-facing signal, without ever touching a rule
//          document itself.
// Dependencies: scoring_core::{ledger, events}, crate::{metrics, alerts}
// ============================================================================

//! ## Overview
//! [`FeedbackAnalyzer`] holds no privileged handle into storage: it reads
//! through the same [`DecisionLedger`] trait every other reader uses.
//! [`FeedbackAnalyzer::analyze`] runs one window's computation synchronously
//! and is what the CLI calls for an operator-triggered recomputation;
//! [`FeedbackAnalyzer::run_forever`] wraps it in a `tokio::time::interval`
//! loop for `scoring-api`'s server process.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use scoring_core::events::ConfigEvent;
use scoring_core::events::DecisionEventSink;
use scoring_core::events::Severity;
use scoring_core::identifiers::ToolName;
use scoring_core::ledger::DecisionLedger;
use scoring_core::ledger::LedgerError;
use scoring_core::time::Timestamp;

use crate::alerts::AlertThresholds;
use crate::alerts::PerformanceAlert;
use crate::alerts::evaluate_alerts;
use crate::metrics::PerformanceMetrics;
use crate::metrics::compute_metrics;

/// Errors raised while running one analysis window.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// Reading decisions or feedback from the ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One tool's analysis result: its metrics snapshot plus any alerts that
/// snapshot triggered.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    /// The computed snapshot.
    pub metrics: PerformanceMetrics,
    /// Alerts triggered by `metrics` under the tool's thresholds.
    pub alerts: Vec<PerformanceAlert>,
}

/// Periodic or on-demand calibration/drift analysis over the ledger.
pub struct FeedbackAnalyzer {
    /// The ledger this analyzer reads through; no privileged access path.
    ledger: Arc<dyn DecisionLedger>,
    /// Sink alerts and failures are reported through.
    sink: Arc<dyn DecisionEventSink>,
}

impl FeedbackAnalyzer {
    /// Constructs an analyzer reading through `ledger`, reporting through
    /// `sink`.
    #[must_use]
    pub fn new(ledger: Arc<dyn DecisionLedger>, sink: Arc<dyn DecisionEventSink>) -> Self {
        Self { ledger, sink }
    }

    /// Computes one tool's metrics and alerts for the window `[since, now)`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Ledger`] when the underlying ledger reads
    /// fail.
    pub fn analyze(
        &self,
        tool_name: &ToolName,
        since: Timestamp,
        now: Timestamp,
        thresholds: &AlertThresholds,
    ) -> Result<AnalysisResult, AnalyzerError> {
        let decisions = self.ledger.query_decisions(tool_name, since)?;
        let feedback = self.ledger.query_feedback(tool_name, since)?;
        let metrics = compute_metrics(tool_name, &decisions, &feedback, since, now);
        let alerts = evaluate_alerts(&metrics, thresholds);

        for alert in &alerts {
            self.sink.record_config(ConfigEvent {
                severity: Severity::Warn,
                kind: "performance_alert".to_owned(),
                detail: serde_json::to_value(alert).unwrap_or(serde_json::Value::Null),
            });
        }

        Ok(AnalysisResult { metrics, alerts })
    }

    /// Runs [`FeedbackAnalyzer::analyze`] for every tool in `tools` on a
    /// recurring `period`, until the returned future is dropped or its
    /// runtime is shut down. Each tick's window starts at the previous
    /// tick's `now` for its tool, so windows tile without gaps or overlap.
    ///
    /// A tool whose analysis fails is logged and skipped for that tick;
    /// one tool's ledger error never stops the schedule for the others.
    pub async fn run_forever(self: Arc<Self>, tools: Vec<(ToolName, AlertThresholds)>, period: Duration, clock_now: impl Fn() -> Timestamp) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut window_start: Vec<Timestamp> = tools.iter().map(|_| clock_now()).collect();

        loop {
            interval.tick().await;
            let now = clock_now();
            for (index, (tool_name, thresholds)) in tools.iter().enumerate() {
                match self.analyze(tool_name, window_start[index], now, thresholds) {
                    Ok(_) => window_start[index] = now,
                    Err(err) => {
                        self.sink.record_config(ConfigEvent {
                            severity: Severity::Error,
                            kind: "feedback_analysis_failed".to_owned(),
                            detail: serde_json::json!({ "tool_name": tool_name.as_str(), "detail": err.to_string() }),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scoring_core::events::NoopEventSink;
    use scoring_store_sqlite::SqliteLedgerStore;

    use super::*;

    #[test]
    fn analyze_returns_zeroed_metrics_for_a_tool_with_no_history() {
        let ledger: Arc<dyn DecisionLedger> = Arc::new(SqliteLedgerStore::open_in_memory().expect("open"));
        let analyzer = FeedbackAnalyzer::new(ledger, Arc::new(NoopEventSink));
        let tool = ToolName::new("timing_score").expect("tool");

        let result = analyzer
            .analyze(&tool, Timestamp::from_unix_millis(0), Timestamp::from_unix_millis(1_000), &AlertThresholds::default())
            .expect("analyze");

        assert_eq!(result.metrics.decision_count, 0);
        assert!(result.alerts.is_empty());
    }
}
