// crates/scoring-config/src/lib.rs
// ============================================================================
// Module: Scoring Config Library
// Description: Public API surface for the process-wide configuration model.
// Purpose: Expose `ScoringConfig` and its nested sections to every other
//          crate that needs startup configuration.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! A single [`ScoringConfig`] aggregate is loaded once at process start by
//! `scoring-cli`'s `serve` command and passed by reference to every
//! subsystem that needs it. There is no hot-reload path for configuration;
//! see [`ScoringConfig::validate`] for what is checked before the process
//! is allowed to start serving.

#![deny(missing_docs)]

pub mod config;

pub use config::BrokerConfig;
pub use config::ConfigError;
pub use config::ExperimentConfig;
pub use config::JournalMode;
pub use config::LedgerStoreConfig;
pub use config::RuleSourceConfig;
pub use config::ScoringConfig;
pub use config::SlaClass;
