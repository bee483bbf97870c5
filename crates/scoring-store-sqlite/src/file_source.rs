// crates/scoring-store-sqlite/src/file_source.rs
// ============================================================================
// Module: File-Tree Rule Source
// Description: RuleSource backed by one JSON document per (tool, version)
//              under a directory tree, with a manifest pinning lifecycle.
// Purpose: Give operators a source they can author and review with plain
//          text tools and a diff, before promoting to the SQLite source.
// Dependencies: std::fs, serde_json, scoring_core::{rule, rule_store}
// ============================================================================

//! ## Overview
//! Layout: `<root>/<tool_name>/<version>.json` holds one [`RuleDocument`];
//! `<root>/<tool_name>/manifest.json` holds `{"production": "...",
//! "shadow": "..."}` pointers. Missing documents and missing manifests are
//! both reported through [`RuleStoreError`] rather than panicking, since a
//! rule author's typo should surface as a normal tool error.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use scoring_core::error::RuleStoreError;
use scoring_core::identifiers::RuleVersion;
use scoring_core::identifiers::ToolName;
use scoring_core::rule::RuleDocument;
use scoring_core::rule_store::RuleSource;

/// A [`RuleSource`] backed by a directory tree of JSON documents.
pub struct FileTreeRuleSource {
    root: PathBuf,
}

impl FileTreeRuleSource {
    /// Creates a source rooted at `root`. The directory need not exist yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads and parses `<root>/<tool>/manifest.json`.
    fn manifest(&self, tool: &ToolName) -> Result<Manifest, RuleStoreError> {
        let path = self.root.join(tool.as_str()).join("manifest.json");
        let bytes = fs::read(&path).map_err(|err| {
            RuleStoreError::SourceUnavailable(format!("reading manifest at {}: {err}", path.display()))
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|err| RuleStoreError::SourceUnavailable(format!("parsing manifest at {}: {err}", path.display())))
    }
}

/// On-disk lifecycle pointer for one tool's versions.
#[derive(Debug, Deserialize)]
struct Manifest {
    /// Version currently serving production traffic, if any.
    production: Option<String>,
    /// Version currently running in shadow, if any.
    shadow: Option<String>,
}

impl RuleSource for FileTreeRuleSource {
    fn load(&self, tool: &ToolName, version: &RuleVersion) -> Result<RuleDocument, RuleStoreError> {
        let path = self.root.join(tool.as_str()).join(format!("{}.json", version.as_str()));
        let bytes = fs::read(&path).map_err(|_err| RuleStoreError::RuleNotFound {
            tool: tool.clone(),
            version: version.clone(),
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|err| RuleStoreError::SourceUnavailable(format!("parsing {}: {err}", path.display())))
    }

    fn production_version(&self, tool: &ToolName) -> Result<RuleVersion, RuleStoreError> {
        let manifest = self.manifest(tool)?;
        let production = manifest
            .production
            .ok_or_else(|| RuleStoreError::NoProductionVersion { tool: tool.clone() })?;
        RuleVersion::new(production)
            .map_err(|err| RuleStoreError::SourceUnavailable(format!("invalid production version: {err}")))
    }

    fn shadow_version(&self, tool: &ToolName) -> Result<Option<RuleVersion>, RuleStoreError> {
        let manifest = self.manifest(tool)?;
        manifest
            .shadow
            .map(RuleVersion::new)
            .transpose()
            .map_err(|err| RuleStoreError::SourceUnavailable(format!("invalid shadow version: {err}")))
    }
}
