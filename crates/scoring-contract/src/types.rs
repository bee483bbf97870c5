// crates/scoring-contract/src/types.rs
// ============================================================================
// Module: Tool Contract Entities
// Description: Typed descriptions of the fixed tool catalog's input/output
//              shapes, worked examples, and packaging manifest.
// Purpose: Give the API and CLI crates one place to discover what a tool
//          accepts and returns without re-deriving it from the interpreter.
// Dependencies: scoring-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ToolContract`] is the caller-facing description of one of the five
//! fixed tools: its JSON Schema for input and output, a handful of worked
//! [`ToolExample`]s, and a [`DeterminismClass`] noting whether its output can
//! vary for identical input (only because the caller supplied a different
//! `as_of` timestamp — no tool reaches an external system). A
//! [`ContractBundle`] packages every contract together with a
//! [`ContractManifest`] of canonical content hashes, so a client can detect
//! when any contract in the set has changed without diffing every field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use scoring_core::HashDigest;
use scoring_core::ToolName;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Determinism Class
// ============================================================================

/// Whether a tool's output can vary for byte-identical input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminismClass {
    /// Output depends only on the declared input fields and the pinned rule
    /// version.
    Deterministic,
    /// Output additionally depends on a caller-supplied point in time (an
    /// `as_of` or similar field named in the input schema); still
    /// reproducible given the same input, but the input itself changes from
    /// one call to the next.
    TimeDependent,
}

impl DeterminismClass {
    /// Returns the stable lowercase label used in contract documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::TimeDependent => "time_dependent",
        }
    }
}

// ============================================================================
// SECTION: Tool Example
// ============================================================================

/// One worked input/output pair, used both as documentation and as a
/// schema-conformance fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExample {
    /// Short human-readable description of what this example demonstrates.
    pub description: String,
    /// Example input payload, expected to satisfy [`ToolContract::input_schema`].
    pub input: Value,
    /// Example output payload, expected to satisfy [`ToolContract::output_schema`].
    pub output: Value,
}

// ============================================================================
// SECTION: Tool Contract
// ============================================================================

/// Caller-facing description of one fixed tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContract {
    /// Stable tool name (the `POST /tools/{tool_name}` path segment).
    pub name: ToolName,
    /// Human-readable summary of what the tool scores or classifies.
    pub description: String,
    /// JSON Schema the tool's input must satisfy before evaluation.
    pub input_schema: Value,
    /// JSON Schema the tool's result must satisfy.
    pub output_schema: Value,
    /// Determinism classification for this tool.
    pub determinism: DeterminismClass,
    /// Worked examples, at least one per contract.
    pub examples: Vec<ToolExample>,
    /// Free-form notes: known edge cases, deprecation warnings, SLA notes.
    pub notes: String,
}

// ============================================================================
// SECTION: Manifest And Bundle
// ============================================================================

/// One packaged contract's content-addressed entry in a [`ContractManifest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestArtifact {
    /// Tool the artifact describes.
    pub name: ToolName,
    /// Canonical content hash of the contract's JSON representation.
    pub content_hash: HashDigest,
}

/// Index of every packaged contract's content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractManifest {
    /// One entry per contract in the bundle, in catalog order.
    pub artifacts: Vec<ManifestArtifact>,
    /// Content hash over the canonical JSON of `artifacts` itself, so a
    /// client can detect a changed manifest with a single comparison.
    pub manifest_hash: HashDigest,
}

/// One contract together with its own content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractArtifact {
    /// The packaged contract.
    pub contract: ToolContract,
    /// Canonical content hash of `contract`.
    pub content_hash: HashDigest,
}

/// A complete, hash-addressed packaging of the tool catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractBundle {
    /// Every contract in the catalog, each with its own content hash.
    pub artifacts: Vec<ContractArtifact>,
    /// Manifest summarizing `artifacts` by hash.
    pub manifest: ContractManifest,
}
