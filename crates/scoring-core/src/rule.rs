// crates/scoring-core/src/rule.rs
// ============================================================================
// Module: Rule Document Model
// Description: Typed shapes for rule documents and the six rule body kinds.
// Purpose: Give the Rule Interpreter a closed, exhaustively-matchable set of
//          declarative rule bodies with no hidden constants in code.
// Dependencies: rule-logic, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`RuleDocument`] is the immutable, versioned artifact that carries one
//! tool's declarative logic. Its `rules` map is keyed by rule name; each
//! [`Rule`] has a [`RuleBody`] tagged by [`RuleType`]. The interpreter (see
//! [`crate::interpreter`]) dispatches on this tag — there is no subtype
//! hierarchy, only a closed set of variants, which is what makes the whole
//! document auditable by inspection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rule_logic::Requirement;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use serde_json::Value;

use crate::comparator::Comparator;
use crate::identifiers::RuleVersion;
use crate::identifiers::ToolName;

// ============================================================================
// SECTION: Rule Document
// ============================================================================

/// An immutable, versioned declarative rule document for one tool.
///
/// # Invariants
/// - Identity is `(tool_name, version)`; never mutated once published.
/// - Every variable name referenced by a formula is either declared in this
///   document's `rules` map or is a member of the owning tool's input
///   schema. Edge-case conditions reference only declared inputs and named
///   intermediate rule outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    /// The tool this document belongs to.
    pub tool_name: ToolName,
    /// Document metadata (version, lineage, changelog, performance target).
    pub metadata: RuleMetadata,
    /// Named rule entries, evaluated by the interpreter on demand.
    pub rules: BTreeMap<String, Rule>,
    /// Edge-case overrides applied after the document's primary rule
    /// produces a base value, in declaration order.
    #[serde(default)]
    pub edge_cases: Vec<EdgeCase>,
    /// Maps an output field name to the source that fills it once the
    /// primary rule's edge cases have been applied.
    ///
    /// The sentinel `"$primary"` means "the primary rule's post-edge-case
    /// value itself"; `"$confidence"` means this outcome's clamped
    /// confidence. Any other string names another entry in `rules`
    /// (including the primary rule's own name, which resolves to its
    /// post-edge-case value), resolved the same way a formula resolves a
    /// variable. Tools whose result is a single scalar (no multi-field
    /// object) leave this empty, in which case the primary rule's value is
    /// returned as-is.
    #[serde(default)]
    pub output_fields: BTreeMap<String, String>,
    /// Declared fallback values for optional tool inputs absent from the
    /// call payload, applied before the primary rule is evaluated.
    ///
    /// Each applied default is recorded in [`crate::interpreter::EvaluationOutcome::defaults_applied`]
    /// and becomes resolvable under its own name, the same as any other
    /// declared input — a `mapping` rule can branch on whether an optional
    /// field fell back to its default (by giving that default value its own
    /// entry) the same way it branches on any other input value.
    #[serde(default)]
    pub input_defaults: BTreeMap<String, Value>,
}

/// Document-level metadata carried alongside the rule bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMetadata {
    /// This document's version.
    pub version: RuleVersion,
    /// The version this one supersedes, when applicable.
    pub previous_version: Option<RuleVersion>,
    /// Wall-clock creation timestamp, RFC 3339.
    pub created_at: String,
    /// Human-readable summary of what changed from `previous_version`.
    #[serde(default)]
    pub changelog: String,
    /// Declared SLA and accuracy targets for this version.
    pub performance_target: PerformanceTarget,
    /// Publication lifecycle state.
    pub lifecycle: RuleLifecycle,
    /// Confidence floor this document's tools must clamp to.
    pub confidence_floor: f64,
}

/// Declared performance target for a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTarget {
    /// Target p95 latency in milliseconds for strict tools.
    pub p95_latency_ms: u64,
    /// Target minimum success rate once feedback accumulates.
    pub target_success_rate: f64,
}

/// Publication lifecycle state of a [`RuleDocument`].
///
/// # Invariants
/// - At most one `Production` version exists per `tool_name` at a time,
///   enforced by the Rule Store, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleLifecycle {
    /// Authored, not yet promoted to shadow or production traffic.
    Draft,
    /// Running in parallel with production, never returned to callers.
    Shadow,
    /// The version returned to callers by default.
    Production,
    /// Retired; retained for audit and replay, never selected by the router.
    Archived,
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// A single named rule within a [`RuleDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// The rule's declarative body, tagged by [`RuleType`].
    pub body: RuleBody,
}

/// The tag identifying which [`RuleBody`] variant a rule uses.
///
/// # Invariants
/// - Closed set; unrecognized values are rejected by the Rule Store at load
///   time, never at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Arithmetic expression over named variables and constants.
    Formula,
    /// Ordered branches, first matching condition wins.
    DecisionTree,
    /// Exact-match discrete lookup.
    LookupTable,
    /// Keyed exact-match table with a declared default.
    Mapping,
    /// Scalar input mapped through non-overlapping half-open intervals.
    RangeLookup,
    /// Numeric comparator returning a categorical value.
    Threshold,
}

/// Declarative body of a [`Rule`], tagged by [`RuleType`].
///
/// # Invariants
/// - The interpreter dispatches on this tag exhaustively; adding a variant
///   requires updating both the tag and the interpreter in lockstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleBody {
    /// See [`RuleType::Formula`].
    Formula {
        /// The arithmetic expression tree to evaluate.
        expression: FormulaExpr,
    },
    /// See [`RuleType::DecisionTree`].
    DecisionTree {
        /// Ordered branches; the first whose condition is true wins.
        branches: Vec<DecisionBranch>,
        /// Output used when no branch matches.
        fallback: Value,
    },
    /// See [`RuleType::LookupTable`].
    LookupTable {
        /// Name of the variable resolved and matched against `entries`.
        input: String,
        /// Exact-match entries.
        entries: Vec<LookupEntry>,
    },
    /// See [`RuleType::Mapping`].
    Mapping {
        /// Name of the variable resolved and matched against `entries`.
        input: String,
        /// Keyed exact-match entries.
        entries: BTreeMap<String, Value>,
        /// Value returned when the key is absent.
        default: Value,
    },
    /// See [`RuleType::RangeLookup`].
    RangeLookup {
        /// Name of the variable resolved and matched against `intervals`.
        input: String,
        /// Non-overlapping half-open `[low, high)` intervals, sorted by
        /// `low`. Validated for coverage and ordering at load time.
        intervals: Vec<RangeInterval>,
    },
    /// See [`RuleType::Threshold`].
    Threshold {
        /// Name of the variable resolved and compared against `cutoffs`.
        input: String,
        /// Ascending cutoffs; the output is the value of the last cutoff
        /// the input meets or exceeds, or `below_all` if none do.
        cutoffs: Vec<ThresholdCutoff>,
        /// Output used when the input is below every cutoff.
        below_all: Value,
    },
}

impl RuleBody {
    /// Returns the [`RuleType`] tag for this body.
    #[must_use]
    pub const fn rule_type(&self) -> RuleType {
        match self {
            Self::Formula { .. } => RuleType::Formula,
            Self::DecisionTree { .. } => RuleType::DecisionTree,
            Self::LookupTable { .. } => RuleType::LookupTable,
            Self::Mapping { .. } => RuleType::Mapping,
            Self::RangeLookup { .. } => RuleType::RangeLookup,
            Self::Threshold { .. } => RuleType::Threshold,
        }
    }
}

/// A single branch of a [`RuleBody::DecisionTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionBranch {
    /// Condition tree guarding this branch.
    pub condition: ConditionTree,
    /// Output produced when `condition` is the first to match.
    pub output: Value,
}

/// A single exact-match entry of a [`RuleBody::LookupTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    /// The exact key to match against the resolved input.
    pub key: Value,
    /// The value returned on an exact match.
    pub value: Value,
}

/// A half-open `[low, high)` interval of a [`RuleBody::RangeLookup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeInterval {
    /// Inclusive lower bound.
    pub low: Number,
    /// Exclusive upper bound.
    pub high: Number,
    /// Value returned for inputs in `[low, high)`.
    pub value: Value,
}

/// A single ascending cutoff of a [`RuleBody::Threshold`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCutoff {
    /// The cutoff value; the input must be `>=` this to qualify.
    pub at: Number,
    /// Output produced once the input meets or exceeds `at`.
    pub value: Value,
}

// ============================================================================
// SECTION: Conditions
// ============================================================================

/// A single leaf predicate: compare a named variable against a declared
/// operand.
///
/// # Invariants
/// - `variable` addresses either a declared tool input or a named
///   intermediate rule output; the Rule Store rejects documents that
///   reference anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Name of the variable to resolve from the evaluation context.
    pub variable: String,
    /// Comparator applied to the resolved value.
    pub comparator: Comparator,
    /// Declared operand compared against the resolved value.
    pub operand: Value,
}

/// A boolean tree of [`Condition`] leaves, composed with the universal
/// and/or/not/at-least-n operators.
///
/// This reuses the requirement algebra's tree shape directly: the same
/// [`Requirement`] enum that composes arbitrary predicates in `rule-logic`
/// composes conditions here, without a second and/or/not evaluator.
pub type ConditionTree = Requirement<Condition>;

// ============================================================================
// SECTION: Edge Cases
// ============================================================================

/// A single declared edge-case override.
///
/// # Invariants
/// - Edge cases are applied in declaration order after the owning rule's
///   base value has been produced; each application is itself recorded in
///   the evaluation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCase {
    /// Stable name for this edge case, surfaced in `edge_cases_applied`.
    pub name: String,
    /// Condition that must hold for `action` to apply.
    pub condition: ConditionTree,
    /// Transformation applied to the base value when `condition` holds.
    pub action: EdgeCaseAction,
}

/// An edge-case transformation applied to a rule's base value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EdgeCaseAction {
    /// Multiplies the base numeric value by `factor`.
    Multiply {
        /// Multiplication factor.
        factor: Number,
    },
    /// Adds `delta` to the base numeric value.
    Add {
        /// Additive delta, may be negative.
        delta: Number,
    },
    /// Replaces the base value outright.
    Set {
        /// Replacement value.
        value: Value,
    },
    /// Caps the base numeric value at `upper`.
    Cap {
        /// Upper bound.
        upper: Number,
    },
    /// Floors the base numeric value at `lower`.
    Floor {
        /// Lower bound.
        lower: Number,
    },
}

// ============================================================================
// SECTION: Formula Expressions
// ============================================================================

/// An arithmetic expression tree over named variables and constants.
///
/// # Invariants
/// - Expressions parse to a finite tree; there is no recursion and no
///   free-form code, matching the interpreter's "no side effects"
///   guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormulaExpr {
    /// A named variable, resolved from the evaluation context.
    Var {
        /// Variable name.
        name: String,
    },
    /// A numeric literal.
    Const {
        /// Literal value.
        value: Number,
    },
    /// A binary arithmetic operation.
    BinOp {
        /// Operator.
        op: FormulaOp,
        /// Left operand.
        left: Box<FormulaExpr>,
        /// Right operand.
        right: Box<FormulaExpr>,
    },
    /// A call to one of the declared arithmetic functions.
    Call {
        /// Function identifier.
        func: FormulaFn,
        /// Function arguments, in declaration order.
        args: Vec<FormulaExpr>,
    },
}

/// Binary arithmetic operators available to [`FormulaExpr::BinOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division; division by zero is an [`crate::error::EvaluationError`].
    Div,
}

/// Declared arithmetic functions available to [`FormulaExpr::Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaFn {
    /// Minimum of all arguments.
    Min,
    /// Maximum of all arguments.
    Max,
    /// Rounds the single argument to the nearest integer.
    Round,
    /// Clamps the first argument between the second (low) and third (high).
    Clamp,
}
