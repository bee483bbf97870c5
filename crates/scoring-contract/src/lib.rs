// crates/scoring-contract/src/lib.rs
// ============================================================================
// Module: Scoring Contract Library
// Description: Public API surface for the fixed tool catalog's contracts.
// Purpose: Expose the tool contract entities and the catalog/bundle builders
//          the API and CLI crates use for schema validation and discovery.
// Dependencies: crate::{contract, types}
// ============================================================================

//! ## Overview
//! The scoring engine exposes exactly five tools; this crate is where their
//! input/output shapes and worked examples are declared once, so the HTTP
//! surface, the CLI, and any client generator read from one source instead
//! of re-deriving schemas from the rule documents themselves.

#![deny(missing_docs)]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod contract;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use contract::ContractError;
pub use contract::build_bundle;
pub use contract::tool_catalog;
pub use contract::validate_contract_examples;
pub use types::ContractArtifact;
pub use types::ContractBundle;
pub use types::ContractManifest;
pub use types::DeterminismClass;
pub use types::ManifestArtifact;
pub use types::ToolContract;
pub use types::ToolExample;
