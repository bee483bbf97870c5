// crates/scoring-core/src/events.rs
// ============================================================================
// Module: Decision Event Telemetry
// Description: Observability hooks for rule loading and decision evaluation.
// Purpose: Provide structured event payloads without a hard logging-framework
//          dependency, so downstream deployments can plug in whatever
//          collector they already run.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module exposes a thin event-sink interface rather than pulling in a
//! logging framework: a [`DecisionEventSink`] receives one
//! [`DecisionEvent`] per tool evaluation and one [`ConfigEvent`] per rule
//! load, config change, or shadow-routing decision. [`NoopEventSink`]
//! discards everything; [`StderrJsonEventSink`] writes one JSON object per
//! line to stderr, direct `Write` calls rather than a `println!`/`eprintln!`
//! macro, matching how the rest of the engine's CLI surface emits output.
//! Severity mirrors the error taxonomy's category-to-severity mapping:
//! Validation events are `Debug`, Configuration and Evaluation failures are
//! `Error`, Transient and Timeout are `Warn`, and sampled dropped-log counts
//! are `Warn`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write as _;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::DecisionId;
use crate::identifiers::ToolName;
use crate::identifiers::TraceId;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity level attached to every emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine detail, useful for replay and audit but not actionable.
    Debug,
    /// Expected but noteworthy (a dropped secondary log, a retried call).
    Warn,
    /// An operator- or caller-visible failure.
    Error,
}

// ============================================================================
// SECTION: Decision Event
// ============================================================================

/// One tool evaluation's outcome, emitted regardless of success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// Tool that was evaluated.
    pub tool: ToolName,
    /// Decision identifier, when one was recorded.
    pub decision_id: Option<DecisionId>,
    /// Per-request trace identifier.
    pub trace_id: TraceId,
    /// Event severity.
    pub severity: Severity,
    /// Latency of the primary evaluation, in milliseconds.
    pub latency_ms: u64,
    /// `true` when this evaluation ran as a shadow (never returned to the
    /// caller as the authoritative result).
    pub shadow: bool,
    /// Structured detail: result summary on success, error detail on
    /// failure.
    pub detail: Value,
}

// ============================================================================
// SECTION: Config Event
// ============================================================================

/// A configuration-plane occurrence: a rule load, validation failure, or
/// shadow/A-B routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEvent {
    /// Event severity.
    pub severity: Severity,
    /// Short stable kind label (`rule_loaded`, `rule_invalid`,
    /// `shadow_missing`, `ab_assignment`, ...).
    pub kind: String,
    /// Structured detail for the event.
    pub detail: Value,
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Event sink for decision evaluations and configuration-plane occurrences.
pub trait DecisionEventSink: Send + Sync {
    /// Records a completed tool evaluation.
    fn record_decision(&self, event: DecisionEvent);
    /// Records a configuration-plane occurrence.
    fn record_config(&self, event: ConfigEvent);
}

// ============================================================================
// SECTION: Noop Sink
// ============================================================================

/// Discards every event. The default for unit tests and library embeddings
/// that do not want process-wide side effects.
pub struct NoopEventSink;

impl DecisionEventSink for NoopEventSink {
    fn record_decision(&self, _event: DecisionEvent) {}

    fn record_config(&self, _event: ConfigEvent) {}
}

// ============================================================================
// SECTION: Stderr JSON Sink
// ============================================================================

/// Writes one JSON object per line to stderr.
///
/// # Invariants
/// - Never panics on a write failure; a broken stderr pipe silently drops
///   the event rather than taking down the evaluation path.
pub struct StderrJsonEventSink {
    lock: Mutex<()>,
}

impl StderrJsonEventSink {
    /// Constructs a new stderr JSON event sink.
    #[must_use]
    pub fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }

    /// Serializes `value` and writes it as one line to stderr.
    fn write_line(&self, value: &impl Serialize) {
        let Ok(mut line) = serde_json::to_string(value) else {
            return;
        };
        line.push('\n');
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = std::io::stderr().write_all(line.as_bytes());
    }
}

impl Default for StderrJsonEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionEventSink for StderrJsonEventSink {
    fn record_decision(&self, event: DecisionEvent) {
        self.write_line(&event);
    }

    fn record_config(&self, event: ConfigEvent) {
        self.write_line(&event);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn noop_sink_accepts_every_event_without_panicking() {
        let sink = NoopEventSink;
        sink.record_config(ConfigEvent {
            severity: Severity::Error,
            kind: "rule_invalid".to_owned(),
            detail: json!({"tool": "company_quality"}),
        });
    }

    #[test]
    fn stderr_sink_serializes_without_panicking() {
        let sink = StderrJsonEventSink::new();
        sink.record_config(ConfigEvent {
            severity: Severity::Debug,
            kind: "rule_loaded".to_owned(),
            detail: json!({"version": "v3"}),
        });
    }
}
