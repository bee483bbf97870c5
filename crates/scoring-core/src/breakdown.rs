// crates/scoring-core/src/breakdown.rs
// ============================================================================
// Module: Breakdown
// Description: Ordered, stepwise explainability records for an evaluation.
// Purpose: Let every evaluation step be recorded by the interpreter itself,
//          rather than reconstructed from stack traces after the fact.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`BreakdownStep`] is a value object, not a log line: the interpreter
//! produces it alongside the numeric result it describes. This is what the
//! design notes call "explainability without runtime reflection."

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Breakdown Step
// ============================================================================

/// A single recorded step of an evaluation: a named quantity, its resolved
/// value, and the reason it took that value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownStep {
    /// Name of the variable, rule, or edge case this step describes.
    pub step_name: String,
    /// The resolved value at this step.
    pub value: Value,
    /// Human-readable explanation (e.g. "input", "resolved rule 'score'",
    /// "edge case 'government_entity' applied: multiply(0.05)").
    pub reason: String,
}

impl BreakdownStep {
    /// Constructs a new breakdown step.
    #[must_use]
    pub fn new(step_name: impl Into<String>, value: Value, reason: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            value,
            reason: reason.into(),
        }
    }
}

/// An ordered list of [`BreakdownStep`] values, one evaluation's complete
/// explanation trail.
///
/// # Invariants
/// - Contains at least one entry per variable resolved and one per edge
///   case applied, per the component design's output contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakdown(Vec<BreakdownStep>);

impl Breakdown {
    /// Returns an empty breakdown.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a step to the breakdown.
    pub fn push(&mut self, step: BreakdownStep) {
        self.0.push(step);
    }

    /// Returns the steps in recorded order.
    #[must_use]
    pub fn steps(&self) -> &[BreakdownStep] {
        &self.0
    }

    /// Returns the top `n` steps by absolute numeric magnitude of `value`,
    /// for the `key_factors` field of a composed explanation. Non-numeric
    /// steps are ranked last, preserving their relative recorded order.
    #[must_use]
    pub fn top_factors(&self, n: usize) -> Vec<&BreakdownStep> {
        let mut indexed: Vec<(usize, &BreakdownStep)> = self.0.iter().enumerate().collect();
        indexed.sort_by(|(left_idx, left), (right_idx, right)| {
            let left_mag = left.value.as_f64().map(f64::abs);
            let right_mag = right.value.as_f64().map(f64::abs);
            match (left_mag, right_mag) {
                (Some(left_mag), Some(right_mag)) => right_mag
                    .partial_cmp(&left_mag)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(left_idx.cmp(right_idx)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => left_idx.cmp(right_idx),
            }
        });
        indexed.into_iter().take(n).map(|(_, step)| step).collect()
    }
}
