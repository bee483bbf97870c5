// crates/scoring-api/src/ids.rs
// ============================================================================
// Module: Request Identifier Generation
// Description: Generates decision, feedback, and trace identifiers at the
//              HTTP boundary.
// Purpose: Give every inbound request a unique, opaque identifier without
//          reaching for a UUID dependency the rest of the workspace does
//          not otherwise need.
// Dependencies: scoring-core
// ============================================================================

//! ## Overview
//! `scoring-core` never generates identifiers itself — callers supply them
//! (see [`scoring_core::identifiers`]). This module is that caller, for the
//! one caller that has no natural identifier of its own to reuse: an
//! inbound HTTP request. Each id hashes a process-local counter together
//! with the current wall clock, the same hash-then-hex-encode idiom
//! [`scoring_tools::assign_variant`] uses for deterministic bucketing,
//! applied here only for uniqueness rather than determinism.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use scoring_core::DecisionId;
use scoring_core::FeedbackId;
use scoring_core::TraceId;
use scoring_core::hashing::HashAlgorithm;
use scoring_core::hashing::hash_bytes;

/// Monotonically increasing counter mixed into every generated identifier,
/// so two ids requested within the same millisecond never collide.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Returns a short hex fingerprint unique to this process invocation.
fn fingerprint() -> String {
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or_default();
    let seed = format!("{nanos}:{sequence}");
    let digest = hash_bytes(HashAlgorithm::Sha256, seed.as_bytes());
    digest.value[..20].to_owned()
}

/// Generates a fresh, unique [`DecisionId`] for an inbound tool call.
#[must_use]
pub fn new_decision_id() -> DecisionId {
    DecisionId::new(format!("dec_{}", fingerprint())).unwrap_or_else(|_| unreachable!("generated identifier is always valid"))
}

/// Generates a fresh, unique [`FeedbackId`] for an inbound feedback record.
#[must_use]
pub fn new_feedback_id() -> FeedbackId {
    FeedbackId::new(format!("fb_{}", fingerprint())).unwrap_or_else(|_| unreachable!("generated identifier is always valid"))
}

/// Generates a fresh, unique [`TraceId`] for an inbound request.
#[must_use]
pub fn new_trace_id() -> TraceId {
    TraceId::new(format!("trc_{}", fingerprint())).unwrap_or_else(|_| unreachable!("generated identifier is always valid"))
}
