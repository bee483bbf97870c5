// crates/scoring-core/src/lib.rs
// ============================================================================
// Module: Scoring Core Library
// Description: Public API surface for the deterministic scoring engine core.
// Purpose: Expose the rule document model, interpreter, evaluation context,
//          error taxonomy, and supporting primitives shared by every other
//          crate in the workspace.
// Dependencies: crate::{breakdown, comparator, context, error, events,
//               hashing, identifiers, interpreter, ledger, rule, rule_store,
//               time}
// ============================================================================

//! ## Overview
//! Scoring core is backend-agnostic: it defines what a rule document is, how
//! it is validated and evaluated, and how an evaluation explains itself. It
//! has no knowledge of HTTP, SQLite, or process boundaries — those live in
//! `scoring-api`, `scoring-store-sqlite`, and `scoring-broker` respectively,
//! which depend on this crate rather than the other way around.

#![deny(missing_docs)]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod breakdown;
pub mod comparator;
pub mod context;
pub mod error;
pub mod events;
pub mod hashing;
pub mod identifiers;
pub mod interpreter;
pub mod ledger;
pub mod rule;
pub mod rule_store;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use breakdown::Breakdown;
pub use breakdown::BreakdownStep;
pub use comparator::Comparator;
pub use comparator::evaluate_comparator;
pub use context::EvaluationContext;
pub use error::ErrorCode;
pub use error::EvaluationError;
pub use error::ExecutorError;
pub use error::RuleStoreError;
pub use error::RuleViolation;
pub use error::SchemaValidationError;
pub use error::SchemaViolation;
pub use events::ConfigEvent;
pub use events::DecisionEvent;
pub use events::DecisionEventSink;
pub use events::NoopEventSink;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::DecisionId;
pub use identifiers::ExperimentId;
pub use identifiers::FeedbackId;
pub use identifiers::RuleVersion;
pub use identifiers::SubjectKey;
pub use identifiers::TenantId;
pub use identifiers::ToolName;
pub use identifiers::TraceId;
pub use interpreter::EvaluationOutcome;
pub use interpreter::evaluate_named_rule;
pub use interpreter::evaluate_primary;
pub use ledger::ABAssignment;
pub use ledger::DecisionLedger;
pub use ledger::DecisionRecord;
pub use ledger::FeedbackOutcome;
pub use ledger::FeedbackRecord;
pub use ledger::LedgerError;
pub use ledger::PatternCacheEntry;
pub use ledger::PerformanceSummary;
pub use rule::RuleDocument;
pub use rule_store::RuleSource;
pub use rule_store::RuleStore;
pub use rule_store::validate_rule_document;
pub use time::MonotonicInstant;
pub use time::Timestamp;
