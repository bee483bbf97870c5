// crates/scoring-core/src/ledger.rs
// ============================================================================
// Module: Decision Ledger Entities
// Description: Typed records for logged decisions, feedback, and A/B state.
// Purpose: Define the backend-agnostic entity shapes and the trait a
//          concrete store (SQLite today) implements, so the executor and
//          feedback analyzer depend on this crate, not on storage details.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every tool evaluation that is not a shadow run is appended as a
//! [`DecisionRecord`]; shadow evaluations ride alongside the primary record
//! rather than getting one of their own (see the `shadow_result` field).
//! [`FeedbackRecord`] closes the loop when a caller reports whether a
//! recommendation panned out. [`ABAssignment`] pins a subject to an
//! experiment variant once, deterministically, for the lifetime of the
//! experiment. [`PatternCacheEntry`] memoizes a prior decision's result by
//! canonical input hash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::breakdown::BreakdownStep;
use crate::hashing::HashDigest;
use crate::identifiers::DecisionId;
use crate::identifiers::ExperimentId;
use crate::identifiers::FeedbackId;
use crate::identifiers::RuleVersion;
use crate::identifiers::SubjectKey;
use crate::identifiers::TenantId;
use crate::identifiers::ToolName;
use crate::identifiers::TraceId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Decision Record
// ============================================================================

/// One logged tool evaluation.
///
/// # Invariants
/// - `decision_id` is unique for the lifetime of the ledger.
/// - `shadow_result` is populated only when a shadow rule version was
///   configured for `tool_name` at evaluation time; it is never returned to
///   the caller as the authoritative `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Unique identifier for this decision.
    pub decision_id: DecisionId,
    /// Tool that was evaluated.
    pub tool_name: ToolName,
    /// Production rule version used to produce `result`.
    pub rule_version: RuleVersion,
    /// Caller-supplied subject the decision concerns (a company, contact).
    pub subject_key: SubjectKey,
    /// Per-request trace identifier.
    pub trace_id: TraceId,
    /// Tenant the decision was made on behalf of.
    pub tenant_id: TenantId,
    /// Raw input payload, post-default-application.
    pub input: Value,
    /// Authoritative result returned to the caller.
    pub result: Value,
    /// Full explanation trail for `result`.
    pub breakdown: Vec<BreakdownStep>,
    /// Confidence this decision was logged with, in `[floor, 1.0]`.
    pub confidence: f64,
    /// The most influential breakdown steps behind `result`.
    pub key_factors: Vec<BreakdownStep>,
    /// Every intermediate rule value computed while producing `result`.
    pub variables: Value,
    /// Result of a parallel shadow-version evaluation, when configured.
    pub shadow_result: Option<Value>,
    /// Rule version used for `shadow_result`, when present.
    pub shadow_rule_version: Option<RuleVersion>,
    /// A/B experiment variant this decision was routed to, when applicable.
    pub experiment_variant: Option<String>,
    /// Wall-clock time the decision was recorded.
    pub created_at: Timestamp,
    /// Primary evaluation latency, in milliseconds.
    pub latency_ms: u64,
}

// ============================================================================
// SECTION: Feedback Record
// ============================================================================

/// Caller-reported outcome for a previously logged decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// The recommendation led to the intended downstream action.
    Accepted,
    /// The recommendation was explicitly rejected.
    Rejected,
    /// The downstream action happened but diverged from the recommendation.
    Overridden,
}

/// One piece of closed-loop feedback against a [`DecisionRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Unique identifier for this feedback entry.
    pub feedback_id: FeedbackId,
    /// Decision this feedback closes the loop on.
    pub decision_id: DecisionId,
    /// Caller-reported outcome.
    pub outcome: FeedbackOutcome,
    /// Free-form structured detail (e.g. the override value, a reason code).
    pub detail: Value,
    /// Wall-clock time the feedback was recorded.
    pub observed_at: Timestamp,
}

// ============================================================================
// SECTION: A/B Assignment
// ============================================================================

/// A subject's fixed assignment to one variant of an experiment.
///
/// # Invariants
/// - Assignment is computed once (deterministically, by a fixed-seed hash
///   of `experiment_id` and `subject_key`) and never reassigned while the
///   experiment is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ABAssignment {
    /// Experiment this assignment belongs to.
    pub experiment_id: ExperimentId,
    /// Subject pinned to `variant`.
    pub subject_key: SubjectKey,
    /// Assigned variant label.
    pub variant: String,
    /// Wall-clock time the assignment was first made.
    pub assigned_at: Timestamp,
}

// ============================================================================
// SECTION: Pattern Cache Entry
// ============================================================================

/// A memoized decision result keyed by canonical input hash.
///
/// # Invariants
/// - `input_hash` is computed over the same canonical JSON representation
///   used for rule-document hashing, so cache keys are stable regardless of
///   field order in the caller's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCacheEntry {
    /// Tool the cached result belongs to.
    pub tool_name: ToolName,
    /// Rule version the cached result was produced under.
    pub rule_version: RuleVersion,
    /// Canonical hash of the input payload.
    pub input_hash: HashDigest,
    /// Cached result value.
    pub result: Value,
    /// Wall-clock time the entry was cached.
    pub cached_at: Timestamp,
}

// ============================================================================
// SECTION: Decision Ledger Trait
// ============================================================================

/// Aggregate performance snapshot for one tool over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Tool this summary covers.
    pub tool_name: ToolName,
    /// Rule version this summary covers.
    pub rule_version: RuleVersion,
    /// Total decisions logged in the window.
    pub decision_count: u64,
    /// Feedback entries received in the window.
    pub feedback_count: u64,
    /// Fraction of feedback entries that were `Accepted`.
    pub acceptance_rate: f64,
    /// p95 latency observed in the window, in milliseconds.
    pub p95_latency_ms: u64,
}

/// Errors raised by a [`DecisionLedger`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The backing store could not be read or written.
    #[error("ledger store error: {0}")]
    Store(String),
    /// A referenced decision does not exist.
    #[error("no decision recorded for id '{0}'")]
    DecisionNotFound(String),
}

/// Backend-agnostic decision ledger.
///
/// # Invariants
/// - Implementations must guarantee a single authoritative writer so that
///   `decision_id` and `feedback_id` uniqueness holds under concurrent
///   callers; see the SQLite implementation's single-writer architecture.
pub trait DecisionLedger: Send + Sync {
    /// Appends a completed decision.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the write fails.
    fn append_decision(&self, record: DecisionRecord) -> Result<(), LedgerError>;

    /// Appends a feedback entry for a previously logged decision.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DecisionNotFound`] when `record.decision_id`
    /// does not exist, or [`LedgerError::Store`] when the write fails.
    fn append_feedback(&self, record: FeedbackRecord) -> Result<(), LedgerError>;

    /// Records (or returns the existing) A/B assignment for a subject.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the read or write fails.
    fn assign_variant(&self, assignment: ABAssignment) -> Result<ABAssignment, LedgerError>;

    /// Returns decisions logged for `tool_name` at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the read fails.
    fn query_decisions(&self, tool_name: &ToolName, since: Timestamp) -> Result<Vec<DecisionRecord>, LedgerError>;

    /// Returns the single decision logged under `decision_id`, when one
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the read fails.
    fn get_decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionRecord>, LedgerError>;

    /// Returns every feedback entry recorded against `decision_id`, ordered
    /// by observation time.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the read fails.
    fn feedback_for_decision(&self, decision_id: &DecisionId) -> Result<Vec<FeedbackRecord>, LedgerError>;

    /// Returns feedback logged against `tool_name`'s decisions at or after
    /// `since`, ordered by observation time.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the read fails.
    fn query_feedback(&self, tool_name: &ToolName, since: Timestamp) -> Result<Vec<FeedbackRecord>, LedgerError>;

    /// Summarizes performance for `tool_name` since `since`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the read fails.
    fn summarize_performance(&self, tool_name: &ToolName, since: Timestamp) -> Result<PerformanceSummary, LedgerError>;

    /// Looks up a cached pattern result by input hash, when present.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the read fails.
    fn lookup_pattern(&self, tool_name: &ToolName, input_hash: &HashDigest) -> Result<Option<PatternCacheEntry>, LedgerError>;

    /// Stores a pattern cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the write fails.
    fn store_pattern(&self, entry: PatternCacheEntry) -> Result<(), LedgerError>;
}
