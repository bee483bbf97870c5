// crates/scoring-api/src/state.rs
// ============================================================================
// Module: Application State
// Description: The shared, immutable handle set every handler operates over.
// Purpose: Give every axum handler the same Decision Executor, ledger, rule
//          store, and tool registry without re-wiring them per request.
// Dependencies: scoring-core, scoring-tools, scoring-config
// ============================================================================

//! ## Overview
//! [`AppState`] is cloned into every request (it is a handful of `Arc`s, so
//! cloning is cheap) and carries nothing request-scoped. It is built once by
//! `scoring-cli`'s `serve` command, after
//! [`scoring_config::ScoringConfig::validate`] has passed, and never
//! mutated for the life of the process — matching the "rule snapshots are
//! the only process-wide shared data" design note. `ledger` here is
//! whatever `DecisionLedger` the caller hands in; `serve` passes the
//! broker-wrapped one so reads still see real data while writes are
//! dispatched off-thread.

use std::sync::Arc;

use scoring_core::DecisionEventSink;
use scoring_core::DecisionLedger;
use scoring_core::RuleStore;
use scoring_config::ScoringConfig;
use scoring_feedback::FeedbackAnalyzer;
use scoring_tools::Clock;
use scoring_tools::DecisionExecutor;
use scoring_tools::ToolRegistry;

/// Shared, read-only handle set every HTTP handler operates over.
#[derive(Clone)]
pub struct AppState {
    /// Runs the seven-step call procedure for every tool invocation.
    pub executor: Arc<DecisionExecutor>,
    /// The ledger every read-side handler queries directly (bypassing the
    /// write-dispatching broker, since reads need the real answer).
    pub ledger: Arc<dyn DecisionLedger>,
    /// Resolves which of the five tools a call names and enforces policy.
    pub registry: Arc<ToolRegistry>,
    /// Backing rule document source, queried directly by `/readyz`.
    pub rule_store: Arc<RuleStore>,
    /// On-demand recomputation for the feedback endpoints.
    pub analyzer: Arc<FeedbackAnalyzer>,
    /// Clock used to stamp request-scoped events.
    pub clock: Arc<dyn Clock>,
    /// Sink every handler reports configuration-plane occurrences through.
    pub sink: Arc<dyn DecisionEventSink>,
    /// Validated process configuration, for SLA lookups and defaults.
    pub config: Arc<ScoringConfig>,
}
