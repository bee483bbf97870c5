// crates/scoring-store-sqlite/src/lib.rs
// ============================================================================
// Module: Scoring Store SQLite Library
// Description: Public API surface for the durable ledger and rule sources.
// Purpose: Expose concrete RuleSource and DecisionLedger implementations to
//          the composition roots in scoring-api and scoring-cli.
// Dependencies: crate::{schema, ledger_store, file_source, sqlite_rules}
// ============================================================================

//! ## Overview
//! Two [`scoring_core::rule_store::RuleSource`] implementations are
//! provided — [`FileTreeRuleSource`] for plain-text-reviewable authoring,
//! [`SqliteRuleSource`] for operator-driven promotion without a deploy —
//! alongside the one [`scoring_core::ledger::DecisionLedger`]
//! implementation, [`SqliteLedgerStore`], that every deployment uses.

#![deny(missing_docs)]

mod file_source;
mod ledger_store;
mod schema;
mod sqlite_rules;

pub use file_source::FileTreeRuleSource;
pub use ledger_store::SqliteLedgerStore;
pub use sqlite_rules::SqliteRuleSource;
