// crates/scoring-core/src/rule_store.rs
// ============================================================================
// Module: Rule Store
// Description: Backend-agnostic rule document loading, validation, caching.
// Purpose: Give the rest of the engine one place to resolve a tool's
//          production or shadow rule document by version, with load-time
//          structural validation and no re-validation on every decision.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! [`RuleSource`] is the backend-agnostic interface a file-tree or SQLite
//! implementation satisfies; [`RuleStore`] wraps one source with an
//! in-memory cache and runs [`validate_rule_document`] once per `(tool,
//! version)` the first time it is loaded. A document that fails validation
//! is never cached and never reaches the interpreter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::error::RuleStoreError;
use crate::error::RuleViolation;
use crate::identifiers::RuleVersion;
use crate::identifiers::ToolName;
use crate::rule::ConditionTree;
use crate::rule::FormulaExpr;
use crate::rule::Rule;
use crate::rule::RuleBody;
use crate::rule::RuleDocument;

// ============================================================================
// SECTION: Rule Source
// ============================================================================

/// Backend-agnostic source of rule documents.
///
/// # Invariants
/// - Implementations must be deterministic: the same `(tool, version)`
///   always returns byte-identical documents, since [`RuleStore`] caches on
///   that key for the process lifetime.
pub trait RuleSource: Send + Sync {
    /// Loads one versioned rule document.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::RuleNotFound`] when the `(tool, version)`
    /// pair does not exist, or [`RuleStoreError::SourceUnavailable`] when
    /// the backing source cannot be read.
    fn load(&self, tool: &ToolName, version: &RuleVersion) -> Result<RuleDocument, RuleStoreError>;

    /// Resolves the tool's current production version.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::NoProductionVersion`] when no version has
    /// been promoted to production for `tool`.
    fn production_version(&self, tool: &ToolName) -> Result<RuleVersion, RuleStoreError>;

    /// Resolves the tool's current shadow version, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::SourceUnavailable`] when the backing
    /// source cannot be read.
    fn shadow_version(&self, tool: &ToolName) -> Result<Option<RuleVersion>, RuleStoreError>;

    /// Reports source readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::SourceUnavailable`] when the source is
    /// unreachable.
    fn readiness(&self) -> Result<(), RuleStoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Rule Store
// ============================================================================

/// Caching, validating front end over a [`RuleSource`].
pub struct RuleStore {
    source: Box<dyn RuleSource>,
    cache: Mutex<HashMap<(ToolName, RuleVersion), Arc<RuleDocument>>>,
}

impl RuleStore {
    /// Wraps a backend source with an in-memory validation cache.
    #[must_use]
    pub fn new(source: Box<dyn RuleSource>) -> Self {
        Self { source, cache: Mutex::new(HashMap::new()) }
    }

    /// Resolves and returns the tool's production rule document.
    ///
    /// # Errors
    ///
    /// Propagates [`RuleStoreError`] from version resolution or loading.
    pub fn production(&self, tool: &ToolName) -> Result<Arc<RuleDocument>, RuleStoreError> {
        let version = self.source.production_version(tool)?;
        self.get(tool, &version)
    }

    /// Resolves and returns the tool's shadow rule document, when one is
    /// configured.
    ///
    /// # Errors
    ///
    /// Propagates [`RuleStoreError`] from version resolution or loading.
    pub fn shadow(&self, tool: &ToolName) -> Result<Option<Arc<RuleDocument>>, RuleStoreError> {
        match self.source.shadow_version(tool)? {
            Some(version) => Ok(Some(self.get(tool, &version)?)),
            None => Ok(None),
        }
    }

    /// Resolves a specific `(tool, version)` pair, validating and caching it
    /// on first load.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::RuleNotFound`], [`RuleStoreError::RuleInvalid`],
    /// or [`RuleStoreError::SourceUnavailable`].
    pub fn get(&self, tool: &ToolName, version: &RuleVersion) -> Result<Arc<RuleDocument>, RuleStoreError> {
        let key = (tool.clone(), version.clone());
        if let Some(cached) = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(&key) {
            return Ok(Arc::clone(cached));
        }

        let document = self.source.load(tool, version)?;
        let violations = validate_rule_document(&document);
        if !violations.is_empty() {
            return Err(RuleStoreError::RuleInvalid {
                tool: tool.clone(),
                version: version.clone(),
                violations,
            });
        }

        let document = Arc::new(document);
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, Arc::clone(&document));
        Ok(document)
    }

    /// Reports readiness of the backing source.
    ///
    /// # Errors
    ///
    /// Propagates [`RuleStoreError::SourceUnavailable`] from the source.
    pub fn readiness(&self) -> Result<(), RuleStoreError> {
        self.source.readiness()
    }
}

// ============================================================================
// SECTION: Structural Validation
// ============================================================================

/// Validates a rule document's internal structure, independent of any tool
/// input schema.
///
/// Checks, per rule: (a) the rule body tag is one of the six recognized
/// kinds, enforced structurally by [`RuleBody`]'s closed, tagged
/// representation and never reachable here; (b) a formula does not
/// reference its own rule name, which would guarantee a cycle; (c) a
/// decision tree with a null fallback declares at least one branch; (d)
/// range-lookup intervals are sorted and non-overlapping, and threshold
/// cutoffs are strictly ascending.
#[must_use]
pub fn validate_rule_document(doc: &RuleDocument) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for (name, Rule { body }) in &doc.rules {
        match body {
            RuleBody::Formula { expression } => {
                if formula_references_name(expression, name) {
                    violations.push(RuleViolation::in_rule(
                        name,
                        format!("formula rule '{name}' references itself, which is always cyclic"),
                    ));
                }
            }
            RuleBody::DecisionTree { branches, fallback } => {
                if branches.is_empty() && fallback.is_null() {
                    violations.push(RuleViolation::in_rule(
                        name,
                        "decision tree has no branches and a null fallback can never resolve",
                    ));
                }
            }
            RuleBody::RangeLookup { intervals, .. } => {
                let mut previous_high: Option<&serde_json::Number> = None;
                for interval in intervals {
                    if !number_lt(&interval.low, &interval.high) {
                        violations.push(RuleViolation::in_rule(
                            name,
                            format!("range interval [{}, {}) is not a valid half-open range", interval.low, interval.high),
                        ));
                    }
                    if let Some(previous_high) = previous_high
                        && !number_le(previous_high, &interval.low)
                    {
                        violations.push(RuleViolation::in_rule(
                            name,
                            "range_lookup intervals must be sorted and non-overlapping",
                        ));
                    }
                    previous_high = Some(&interval.high);
                }
            }
            RuleBody::Threshold { cutoffs, .. } => {
                let mut previous_at: Option<&serde_json::Number> = None;
                for cutoff in cutoffs {
                    if let Some(previous_at) = previous_at
                        && !number_lt(previous_at, &cutoff.at)
                    {
                        violations.push(RuleViolation::in_rule(
                            name,
                            "threshold cutoffs must be strictly ascending",
                        ));
                    }
                    previous_at = Some(&cutoff.at);
                }
            }
            RuleBody::LookupTable { .. } | RuleBody::Mapping { .. } => {}
        }
    }

    if doc.tool_name.as_str() == "timing_score"
        && !doc.edge_cases.iter().any(|edge_case| condition_tree_references(&edge_case.condition, "fiscal_context"))
    {
        violations.push(RuleViolation::in_rule(
            "edge_cases",
            "timing_score documents must declare an edge case referencing 'fiscal_context'",
        ));
    }

    violations
}

/// Returns whether `tree` references `variable` in any leaf [`Condition`].
fn condition_tree_references(tree: &ConditionTree, variable: &str) -> bool {
    match tree {
        ConditionTree::Predicate(condition) => condition.variable == variable,
        ConditionTree::Not(inner) => condition_tree_references(inner, variable),
        ConditionTree::And(parts) | ConditionTree::Or(parts) => {
            parts.iter().any(|part| condition_tree_references(part, variable))
        }
        ConditionTree::RequireGroup { reqs, .. } => {
            reqs.iter().any(|req| condition_tree_references(req, variable))
        }
    }
}

/// Returns whether a formula expression tree references `name` as a bare
/// variable anywhere within it.
fn formula_references_name(expr: &FormulaExpr, name: &str) -> bool {
    match expr {
        FormulaExpr::Var { name: var_name } => var_name == name,
        FormulaExpr::Const { .. } => false,
        FormulaExpr::BinOp { left, right, .. } => {
            formula_references_name(left, name) || formula_references_name(right, name)
        }
        FormulaExpr::Call { args, .. } => args.iter().any(|arg| formula_references_name(arg, name)),
    }
}

/// Compares two JSON numbers for `<` using their stable string rendering.
fn number_lt(left: &serde_json::Number, right: &serde_json::Number) -> bool {
    use std::cmp::Ordering;
    number_cmp(left, right) == Some(Ordering::Less)
}

/// Compares two JSON numbers for `<=` using their stable string rendering.
fn number_le(left: &serde_json::Number, right: &serde_json::Number) -> bool {
    use std::cmp::Ordering;
    matches!(number_cmp(left, right), Some(Ordering::Less | Ordering::Equal))
}

/// Orders two JSON numbers via `f64` comparison, sufficient for load-time
/// structural checks (as opposed to decision-time decimal arithmetic).
fn number_cmp(left: &serde_json::Number, right: &serde_json::Number) -> Option<std::cmp::Ordering> {
    left.as_f64()?.partial_cmp(&right.as_f64()?)
}
