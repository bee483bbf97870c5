// crates/scoring-store-sqlite/src/sqlite_rules.rs
// ============================================================================
// Module: SQLite Rule Source
// Description: RuleSource backed by the rule_versions table.
// Purpose: Let an operator promote/retire rule versions with a single
//          UPDATE instead of rewriting files on disk.
// Dependencies: rusqlite, scoring_core::{rule, rule_store, hashing}
// ============================================================================

//! ## Overview
//! Each row stores a document's canonical content hash alongside its JSON
//! body, computed at write time by [`SqliteRuleSource::put`]. `load` does
//! not re-verify the hash on every call — [`scoring_core::rule_store::RuleStore`]
//! already validates structure once per `(tool, version)` and caches the
//! result; re-hashing on every cache hit would defeat that cache for no
//! correctness benefit.

use rusqlite::Connection;
use rusqlite::OptionalExtension as _;
use rusqlite::params;
use std::sync::Mutex;

use scoring_core::error::RuleStoreError;
use scoring_core::hashing::HashAlgorithm;
use scoring_core::hashing::hash_canonical_json;
use scoring_core::identifiers::RuleVersion;
use scoring_core::identifiers::ToolName;
use scoring_core::rule::RuleDocument;
use scoring_core::rule::RuleLifecycle;
use scoring_core::rule_store::RuleSource;

use crate::schema;

/// A [`RuleSource`] backed by the `rule_versions` table of a SQLite
/// database, usually the same file as the decision ledger.
pub struct SqliteRuleSource {
    /// The single connection this source reads and writes through.
    conn: Mutex<Connection>,
}

impl SqliteRuleSource {
    /// Opens (creating if absent) the rule store database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::SourceUnavailable`] when the database
    /// cannot be opened or schema-initialized.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, RuleStoreError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        schema::initialize(&conn).map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory rule store, for tests and ad hoc CLI runs.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::SourceUnavailable`] when schema
    /// initialization fails.
    pub fn open_in_memory() -> Result<Self, RuleStoreError> {
        let conn = Connection::open_in_memory().map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        schema::initialize(&conn).map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Inserts or replaces one rule document, recomputing its content hash.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::SourceUnavailable`] when serialization,
    /// hashing, or the write fails.
    pub fn put(&self, document: &RuleDocument) -> Result<(), RuleStoreError> {
        let document_json =
            serde_json::to_string(document).map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        let hash = hash_canonical_json(HashAlgorithm::Sha256, document)
            .map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        let conn = self.conn.lock().map_err(|_| RuleStoreError::SourceUnavailable("connection poisoned".to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO rule_versions (tool_name, version, document_json, content_hash, lifecycle, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                document.tool_name.as_str(),
                document.metadata.version.as_str(),
                document_json,
                hash.value,
                lifecycle_str(document.metadata.lifecycle),
                document.metadata.created_at,
            ],
        )
        .map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        Ok(())
    }

    /// Lists every stored version of `tool`, newest first, alongside its
    /// declared lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`RuleStoreError::SourceUnavailable`] when the query fails or
    /// a stored version string is no longer a valid [`RuleVersion`].
    pub fn list_versions(&self, tool: &ToolName) -> Result<Vec<(RuleVersion, RuleLifecycle)>, RuleStoreError> {
        let conn = self.conn.lock().map_err(|_| RuleStoreError::SourceUnavailable("connection poisoned".to_string()))?;
        let mut statement = conn
            .prepare(
                "SELECT version, lifecycle FROM rule_versions WHERE tool_name = ?1
                 ORDER BY created_at DESC",
            )
            .map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
        let rows = statement
            .query_map(params![tool.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;

        let mut versions = Vec::new();
        for row in rows {
            let (version, lifecycle) = row.map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;
            let version = RuleVersion::new(version)
                .map_err(|err| RuleStoreError::SourceUnavailable(format!("invalid version in store: {err}")))?;
            versions.push((version, parse_lifecycle(&lifecycle)?));
        }
        Ok(versions)
    }

    /// Resolves the newest version of `tool` tagged with `lifecycle`.
    fn select_by_lifecycle(&self, tool: &ToolName, lifecycle: &str) -> Result<Option<RuleVersion>, RuleStoreError> {
        let conn = self.conn.lock().map_err(|_| RuleStoreError::SourceUnavailable("connection poisoned".to_string()))?;
        conn.query_row(
            "SELECT version FROM rule_versions WHERE tool_name = ?1 AND lifecycle = ?2
             ORDER BY created_at DESC LIMIT 1",
            params![tool.as_str(), lifecycle],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?
        .map(RuleVersion::new)
        .transpose()
        .map_err(|err| RuleStoreError::SourceUnavailable(format!("invalid version in store: {err}")))
    }
}

/// Maps a [`RuleLifecycle`] to its stored column value.
fn lifecycle_str(lifecycle: RuleLifecycle) -> &'static str {
    match lifecycle {
        RuleLifecycle::Draft => "draft",
        RuleLifecycle::Shadow => "shadow",
        RuleLifecycle::Production => "production",
        RuleLifecycle::Archived => "archived",
    }
}

/// Parses a stored lifecycle column value back into a [`RuleLifecycle`].
fn parse_lifecycle(value: &str) -> Result<RuleLifecycle, RuleStoreError> {
    match value {
        "draft" => Ok(RuleLifecycle::Draft),
        "shadow" => Ok(RuleLifecycle::Shadow),
        "production" => Ok(RuleLifecycle::Production),
        "archived" => Ok(RuleLifecycle::Archived),
        other => Err(RuleStoreError::SourceUnavailable(format!("unknown lifecycle '{other}' in store"))),
    }
}

impl RuleSource for SqliteRuleSource {
    fn load(&self, tool: &ToolName, version: &RuleVersion) -> Result<RuleDocument, RuleStoreError> {
        let conn = self.conn.lock().map_err(|_| RuleStoreError::SourceUnavailable("connection poisoned".to_string()))?;
        let document_json: Option<String> = conn
            .query_row(
                "SELECT document_json FROM rule_versions WHERE tool_name = ?1 AND version = ?2",
                params![tool.as_str(), version.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))?;

        let document_json = document_json.ok_or_else(|| RuleStoreError::RuleNotFound {
            tool: tool.clone(),
            version: version.clone(),
        })?;
        serde_json::from_str(&document_json).map_err(|err| RuleStoreError::SourceUnavailable(err.to_string()))
    }

    fn production_version(&self, tool: &ToolName) -> Result<RuleVersion, RuleStoreError> {
        self.select_by_lifecycle(tool, "production")?
            .ok_or_else(|| RuleStoreError::NoProductionVersion { tool: tool.clone() })
    }

    fn shadow_version(&self, tool: &ToolName) -> Result<Option<RuleVersion>, RuleStoreError> {
        self.select_by_lifecycle(tool, "shadow")
    }
}
