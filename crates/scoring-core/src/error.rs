// crates/scoring-core/src/error.rs
// ============================================================================
// Module: Error Taxonomy
// Description: Typed error enums for every failure category in the engine.
// Purpose: Keep validation, configuration, evaluation, and transient failures
//          distinct so each can be propagated, logged, or swallowed per the
//          engine's error-handling policy.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Six failure categories run through the whole engine: Validation,
//! Configuration, Evaluation, Transient, Timeout, and Dropped-log.
//! Validation and Evaluation errors reach the caller; Configuration errors
//! are an operator concern; Transient and Dropped-log are retried or
//! counted off the primary path. [`ExecutorError`] is the single type the
//! Decision Executor returns, carrying enough structure to pick the right
//! [`ErrorCode`] for the HTTP envelope without re-deriving it from a string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::identifiers::RuleVersion;
use crate::identifiers::ToolName;

// ============================================================================
// SECTION: Evaluation Errors
// ============================================================================

/// A failure raised while evaluating a single rule against a context.
///
/// # Invariants
/// - Every variant carries the rule name that was being evaluated (the
///   "precise locus" the component design requires); the interpreter never
///   returns a partial result alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A formula divided by zero.
    #[error("rule '{rule}' step '{step}': division by zero")]
    DivisionByZero {
        /// Name of the rule being evaluated.
        rule: String,
        /// Name of the formula step that failed.
        step: String,
    },
    /// A formula or condition referenced a variable with no definition.
    #[error("rule '{rule}': undefined variable '{name}'")]
    UndefinedVariable {
        /// Name of the rule being evaluated.
        rule: String,
        /// The undefined variable name.
        name: String,
    },
    /// A lookup or range table had no entry covering the input value.
    #[error("rule '{rule}' step '{step}': no lookup entry covers input {input}")]
    LookupGap {
        /// Name of the rule being evaluated.
        rule: String,
        /// Name of the lookup step that failed.
        step: String,
        /// String rendering of the uncovered input value.
        input: String,
    },
    /// A comparator could not be evaluated against its operands.
    #[error("comparator evaluation failed: {detail}")]
    Comparator {
        /// Human-readable description of the mismatch.
        detail: String,
    },
    /// A decision tree exhausted its branches with no matching condition and
    /// no declared fallback.
    #[error("rule '{rule}': decision tree has no matching branch and no fallback")]
    NoMatchingBranch {
        /// Name of the rule being evaluated.
        rule: String,
    },
    /// An edge-case action could not be applied to the base value.
    #[error("rule '{rule}' edge case '{edge_case}': {detail}")]
    EdgeCaseFailed {
        /// Name of the rule being evaluated.
        rule: String,
        /// Name of the edge case that failed to apply.
        edge_case: String,
        /// Human-readable description of the failure.
        detail: String,
    },
    /// A named rule's evaluation depended, directly or transitively, on
    /// itself.
    #[error("rule '{rule}': cyclic reference detected ({chain})")]
    CyclicReference {
        /// Name of the rule being evaluated when the cycle was detected.
        rule: String,
        /// Human-readable rendering of the dependency chain.
        chain: String,
    },
    /// A formula expression could not be evaluated: wrong arity to a
    /// declared function, or a resolved value that is not numeric.
    #[error("rule '{rule}': formula error: {detail}")]
    Formula {
        /// Name of the rule being evaluated.
        rule: String,
        /// Human-readable description of the failure.
        detail: String,
    },
}

// ============================================================================
// SECTION: Rule Store Errors
// ============================================================================

/// A single structural defect found while validating a rule document.
///
/// # Invariants
/// - Validation collects every violation in one pass rather than stopping at
///   the first, so operator tooling can report them all at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    /// Name of the rule the violation was found in, when applicable.
    pub rule: Option<String>,
    /// Human-readable description of the defect.
    pub detail: String,
}

impl RuleViolation {
    /// Constructs a violation scoped to a named rule.
    #[must_use]
    pub fn in_rule(rule: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rule: Some(rule.into()),
            detail: detail.into(),
        }
    }

    /// Constructs a violation scoped to the document as a whole.
    #[must_use]
    pub fn document(detail: impl Into<String>) -> Self {
        Self {
            rule: None,
            detail: detail.into(),
        }
    }
}

/// Errors raised by the Rule Store's load and lookup operations.
#[derive(Debug, Error)]
pub enum RuleStoreError {
    /// No document exists for the requested `(tool_name, version)`.
    #[error("no rule document for tool '{tool}' version '{version}'")]
    RuleNotFound {
        /// Requested tool name.
        tool: ToolName,
        /// Requested version.
        version: RuleVersion,
    },
    /// A document was found but failed load-time validation.
    #[error("rule document for tool '{tool}' version '{version}' is invalid: {violations:?}")]
    RuleInvalid {
        /// Tool name the invalid document belongs to.
        tool: ToolName,
        /// Version of the invalid document.
        version: RuleVersion,
        /// Every structural defect found during validation.
        violations: Vec<RuleViolation>,
    },
    /// The tool has no production version registered.
    #[error("tool '{tool}' has no production rule version")]
    NoProductionVersion {
        /// Tool name with no production version.
        tool: ToolName,
    },
    /// The backing rule source (file tree, database) could not be read.
    #[error("rule source unavailable: {0}")]
    SourceUnavailable(String),
}

// ============================================================================
// SECTION: Schema Validation Errors
// ============================================================================

/// A single input field that failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// JSON pointer to the offending field.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

/// A tool input failed schema validation before the interpreter ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema validation failed with {} violation(s)", violations.len())]
pub struct SchemaValidationError {
    /// Every field-level violation found, so a caller can fix all of them at
    /// once rather than one round-trip per field.
    pub violations: Vec<SchemaViolation>,
}

// ============================================================================
// SECTION: Executor Errors
// ============================================================================

/// The single error type returned by the Decision Executor's `Execute`
/// operation.
///
/// # Invariants
/// - [`Self::Validation`] and [`Self::Evaluation`]-family variants propagate
///   to the caller; [`Self::error_code`] is the stable mapping to the HTTP
///   envelope's `code` field.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Input failed schema validation; no decision is logged.
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),
    /// The rule store could not resolve a required rule version.
    #[error(transparent)]
    Store(#[from] RuleStoreError),
    /// A rule failed to evaluate against the input.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    /// The primary evaluation exceeded its declared deadline.
    #[error("evaluation exceeded its {deadline_ms}ms deadline")]
    Timeout {
        /// The deadline that was exceeded, in milliseconds.
        deadline_ms: u64,
    },
    /// A configuration precondition was violated (e.g. shadow mode expected
    /// but no shadow rule document is resolvable).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ExecutorError {
    /// Returns the stable HTTP error code for this failure, per the external
    /// tool endpoint contract.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::SchemaValidationError,
            Self::Store(RuleStoreError::RuleNotFound { .. } | RuleStoreError::NoProductionVersion { .. }) => {
                ErrorCode::RuleNotFound
            }
            Self::Store(RuleStoreError::RuleInvalid { .. }) => ErrorCode::RuleInvalid,
            Self::Store(RuleStoreError::SourceUnavailable(_)) => ErrorCode::UpstreamFailure,
            Self::Evaluation(_) => ErrorCode::EvaluationError,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Configuration(_) => ErrorCode::PolicyViolation,
        }
    }
}

/// Stable error codes for the `POST /tools/{tool_name}` response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input violated the tool's declared input schema.
    SchemaValidationError,
    /// The requested rule version does not exist.
    RuleNotFound,
    /// The requested rule version exists but failed validation.
    RuleInvalid,
    /// Rule evaluation encountered an impossible state.
    EvaluationError,
    /// A configuration or access policy precondition was violated.
    PolicyViolation,
    /// The deadline for this tool call was exceeded.
    Timeout,
    /// A backing dependency (store, rule source) was unavailable.
    UpstreamFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_schema_validation_error_code() {
        let err = ExecutorError::Validation(SchemaValidationError {
            violations: vec![],
        });
        assert_eq!(err.error_code(), ErrorCode::SchemaValidationError);
    }

    #[test]
    fn timeout_maps_to_timeout_code() {
        let err = ExecutorError::Timeout {
            deadline_ms: 2_000,
        };
        assert_eq!(err.error_code(), ErrorCode::Timeout);
    }
}
