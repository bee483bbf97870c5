// crates/scoring-broker/src/lib.rs
// ============================================================================
// Module: Scoring Broker Library
// Description: Off-thread dispatch of ledger writes, with backpressure.
// Purpose: Keep the Decision Executor's primary path free of ledger I/O.
// Dependencies: crate::broker
// ============================================================================

//! ## Overview
//! [`BrokerLedger`] wraps a real [`scoring_core::DecisionLedger`] and moves
//! its write operations (`append_decision`, `append_feedback`,
//! `store_pattern`) onto a dedicated worker thread, draining a bounded
//! channel. A full queue is backpressure, not an error: the write is
//! dropped, a lock-free counter is incremented, and a sampled warning is
//! reported through the configured event sink — the caller's request never
//! blocks or fails because the ledger is behind. Read operations
//! (`query_decisions`, `summarize_performance`, `lookup_pattern`,
//! `assign_variant`) pass straight through to the inner ledger, since their
//! callers need the real answer, not a fire-and-forget acknowledgment.

#![deny(missing_docs)]

pub mod broker;

pub use broker::BrokerLedger;
pub use broker::DropCounters;
pub use broker::DropCountersSnapshot;
