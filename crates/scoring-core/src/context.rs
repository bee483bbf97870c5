// crates/scoring-core/src/context.rs
// ============================================================================
// Module: Evaluation Context
// Description: Resolves variable names to values across one tool evaluation.
// Purpose: Give the interpreter a single place to look up declared inputs,
//          cache named-rule results, and record the breakdown trail.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! One [`EvaluationContext`] is built per tool call from its validated input
//! payload. A rule document's named rules can reference each other by name
//! (for example, `score` referencing `base_multiplier`); [`EvaluationContext::resolve`]
//! is the single entry point that decides, for any variable name, whether it
//! is a declared input, an already-computed intermediate, or a named rule
//! still needing evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::breakdown::Breakdown;
use crate::breakdown::BreakdownStep;
use crate::error::EvaluationError;
use crate::rule::RuleDocument;

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Mutable evaluation state threaded through one tool call.
///
/// # Invariants
/// - `resolve` never returns a stale value: once a named rule is evaluated
///   it is cached in `intermediates` and never recomputed for the
///   remainder of the call.
/// - `evaluating` prevents unbounded recursion: a rule that (directly or
///   transitively) depends on itself surfaces as
///   [`EvaluationError::CyclicReference`] instead of overflowing the stack.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    inputs: BTreeMap<String, Value>,
    intermediates: BTreeMap<String, Value>,
    evaluating: Vec<String>,
    defaults_applied: BTreeSet<String>,
    breakdown: Breakdown,
}

impl EvaluationContext {
    /// Builds a context from a tool call's validated input payload.
    #[must_use]
    pub fn new(inputs: BTreeMap<String, Value>) -> Self {
        Self {
            inputs,
            intermediates: BTreeMap::new(),
            evaluating: Vec::new(),
            defaults_applied: BTreeSet::new(),
            breakdown: Breakdown::new(),
        }
    }

    /// Applies a declared default for a missing optional input, recording it
    /// both in the resolvable input set and in the `defaults_applied` list
    /// that the tool response surfaces to callers.
    pub fn apply_default(&mut self, name: &str, value: Value) {
        self.defaults_applied.insert(name.to_owned());
        self.breakdown.push(BreakdownStep::new(
            name,
            value.clone(),
            format!("default applied for missing input '{name}'"),
        ));
        self.inputs.insert(name.to_owned(), value);
    }

    /// Names of every input that fell back to its declared default.
    #[must_use]
    pub fn defaults_applied(&self) -> Vec<String> {
        self.defaults_applied.iter().cloned().collect()
    }

    /// Returns a declared input's raw value without involving the rule
    /// document, for formula/condition variables that never alias a rule
    /// name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Records that a named rule produced `value`, so later lookups reuse it
    /// instead of recomputing.
    pub fn record_intermediate(&mut self, name: &str, value: Value, reason: impl Into<String>) {
        self.breakdown.push(BreakdownStep::new(name, value.clone(), reason));
        self.intermediates.insert(name.to_owned(), value);
    }

    /// Resolves a variable name against, in order: already-computed
    /// intermediates, declared inputs, then named rules in `doc` (evaluated
    /// on demand and memoized).
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::UndefinedVariable`] when `name` is none of
    /// the above, and [`EvaluationError::CyclicReference`] when resolving
    /// `name` would require evaluating a rule already on the current
    /// resolution stack.
    pub fn resolve(
        &mut self,
        doc: &RuleDocument,
        evaluating_rule: &str,
        name: &str,
    ) -> Result<Value, EvaluationError> {
        if let Some(value) = self.intermediates.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.inputs.get(name) {
            return Ok(value.clone());
        }
        if doc.rules.contains_key(name) {
            if self.evaluating.iter().any(|pending| pending == name) {
                let mut chain = self.evaluating.clone();
                chain.push(name.to_owned());
                return Err(EvaluationError::CyclicReference {
                    rule: evaluating_rule.to_owned(),
                    chain: chain.join(" -> "),
                });
            }
            self.evaluating.push(name.to_owned());
            let value = crate::interpreter::evaluate_named_rule(doc, name, self)?;
            self.evaluating.pop();
            return Ok(value);
        }
        Err(EvaluationError::UndefinedVariable {
            rule: evaluating_rule.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Appends a step to the evaluation's breakdown trail directly, for
    /// steps (edge cases, final clamps) that are not variable resolutions.
    pub fn push_breakdown(&mut self, step: BreakdownStep) {
        self.breakdown.push(step);
    }

    /// Returns every intermediate value computed so far, for the tool
    /// response's `variables` field.
    #[must_use]
    pub fn intermediates(&self) -> &BTreeMap<String, Value> {
        &self.intermediates
    }

    /// Consumes the context, returning its accumulated breakdown trail.
    #[must_use]
    pub fn into_breakdown(self) -> Breakdown {
        self.breakdown
    }
}
