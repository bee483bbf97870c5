// crates/scoring-store-sqlite/src/schema.rs
// ============================================================================
// Module: Schema
// Description: DDL for the decision ledger and SQLite-backed rule store.
// Purpose: One place to read the persisted table layout.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! `decision_performance` is not a base table: it is a view computed from
//! `decisions` joined against `feedback`, so the aggregate can never drift
//! from the rows it summarizes.

use rusqlite::Connection;

/// Creates every table, index, and view this crate relies on, if absent.
///
/// # Errors
///
/// Returns a [`rusqlite::Error`] when any statement fails.
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS decisions (
            decision_id         TEXT PRIMARY KEY,
            tool_name           TEXT NOT NULL,
            rule_version        TEXT NOT NULL,
            subject_key         TEXT NOT NULL,
            trace_id            TEXT NOT NULL,
            tenant_id           TEXT NOT NULL,
            input_json          TEXT NOT NULL,
            result_json         TEXT NOT NULL,
            breakdown_json      TEXT NOT NULL,
            confidence          REAL NOT NULL DEFAULT 1.0,
            key_factors_json    TEXT NOT NULL DEFAULT '[]',
            variables_json      TEXT NOT NULL,
            shadow_result_json  TEXT,
            shadow_rule_version TEXT,
            experiment_variant  TEXT,
            created_at_ms       INTEGER NOT NULL,
            latency_ms          INTEGER NOT NULL,
            content_hash        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_decisions_tool_created
            ON decisions (tool_name, created_at_ms);

        CREATE TABLE IF NOT EXISTS feedback (
            feedback_id    TEXT PRIMARY KEY,
            decision_id    TEXT NOT NULL REFERENCES decisions (decision_id),
            outcome        TEXT NOT NULL,
            detail_json    TEXT NOT NULL,
            observed_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_feedback_decision
            ON feedback (decision_id);

        CREATE TABLE IF NOT EXISTS ab_assignments (
            experiment_id  TEXT NOT NULL,
            subject_key    TEXT NOT NULL,
            variant        TEXT NOT NULL,
            assigned_at_ms INTEGER NOT NULL,
            PRIMARY KEY (experiment_id, subject_key)
        );

        CREATE TABLE IF NOT EXISTS rule_versions (
            tool_name      TEXT NOT NULL,
            version        TEXT NOT NULL,
            document_json  TEXT NOT NULL,
            content_hash   TEXT NOT NULL,
            lifecycle      TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            PRIMARY KEY (tool_name, version)
        );
        CREATE INDEX IF NOT EXISTS idx_rule_versions_lifecycle
            ON rule_versions (tool_name, lifecycle);

        CREATE TABLE IF NOT EXISTS pattern_cache (
            tool_name    TEXT NOT NULL,
            rule_version TEXT NOT NULL,
            input_hash   TEXT NOT NULL,
            result_json  TEXT NOT NULL,
            cached_at_ms INTEGER NOT NULL,
            PRIMARY KEY (tool_name, input_hash)
        );

        CREATE VIEW IF NOT EXISTS decision_performance AS
        SELECT
            d.tool_name                                            AS tool_name,
            d.rule_version                                          AS rule_version,
            COUNT(DISTINCT d.decision_id)                           AS decision_count,
            COUNT(f.feedback_id)                                    AS feedback_count,
            SUM(CASE WHEN f.outcome = 'accepted' THEN 1 ELSE 0 END) AS accepted_count,
            d.created_at_ms                                         AS created_at_ms,
            d.latency_ms                                            AS latency_ms
        FROM decisions d
        LEFT JOIN feedback f ON f.decision_id = d.decision_id
        GROUP BY d.tool_name, d.rule_version, d.decision_id;
        ",
    )
}
