// crates/scoring-feedback/src/lib.rs
// ============================================================================
// Module: Scoring Feedback Library
// Description: Public API surface for calibration/drift analysis.
// Purpose: Expose the analyzer, its metrics, and its alert types to
//          scoring-api (scheduled) and scoring-cli (on-demand).
// Dependencies: crate::{metrics, alerts, analyzer}
// ============================================================================

//! ## Overview
//! The feedback analyzer never writes to the ledger and never rewrites a
//! rule document: it reads decisions and feedback for one tool's window and
//! produces [`metrics::PerformanceMetrics`] plus any
//! [`alerts::PerformanceAlert`]s those metrics trigger, for a human or a
//! rule-authoring tool to act on downstream.

#![deny(missing_docs)]

pub mod alerts;
pub mod analyzer;
pub mod metrics;

pub use alerts::AlertThresholds;
pub use alerts::PerformanceAlert;
pub use alerts::evaluate_alerts;
pub use analyzer::AnalysisResult;
pub use analyzer::AnalyzerError;
pub use analyzer::FeedbackAnalyzer;
pub use metrics::CalibrationBucket;
pub use metrics::PerformanceMetrics;
pub use metrics::compute_metrics;
