// crates/scoring-store-sqlite/src/ledger_store.rs
// ============================================================================
// Module: SQLite Decision Ledger
// Description: Durable DecisionLedger backed by a single writer connection
//              and a pool of read-only connections, both in WAL mode.
// Purpose: Give the executor and feedback analyzer a ledger that survives
//          restarts, with concurrent readers never blocked behind a writer.
// Dependencies: rusqlite, scoring_core::{ledger, hashing, identifiers, time}
// ============================================================================

//! ## Overview
//! One [`rusqlite::Connection`] behind a [`Mutex`] owns every write; a fixed
//! pool of read-only connections, selected round-robin, serves every query.
//! [`scoring_broker::BrokerLedger`] already moves writes off the caller's
//! thread with a bounded queue, so this store does not duplicate that
//! queue — it only needs to be safe to call concurrently, not asynchronous
//! on its own. Every decision and pattern-cache row carries a canonical
//! content hash computed at write time, checked again on first read of a
//! database the process didn't just create, to catch on-disk tampering or
//! truncation early rather than silently returning corrupt rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension as _;
use rusqlite::params;

use scoring_core::hashing::HashAlgorithm;
use scoring_core::hashing::HashDigest;
use scoring_core::hashing::hash_canonical_json;
use scoring_core::identifiers::DecisionId;
use scoring_core::identifiers::ExperimentId;
use scoring_core::identifiers::FeedbackId;
use scoring_core::identifiers::RuleVersion;
use scoring_core::identifiers::SubjectKey;
use scoring_core::identifiers::TenantId;
use scoring_core::identifiers::ToolName;
use scoring_core::identifiers::TraceId;
use scoring_core::ledger::ABAssignment;
use scoring_core::ledger::DecisionLedger;
use scoring_core::ledger::DecisionRecord;
use scoring_core::ledger::FeedbackOutcome;
use scoring_core::ledger::FeedbackRecord;
use scoring_core::ledger::LedgerError;
use scoring_core::ledger::PatternCacheEntry;
use scoring_core::ledger::PerformanceSummary;
use scoring_core::time::Timestamp;

use crate::schema;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable, SQLite-backed [`DecisionLedger`].
pub struct SqliteLedgerStore {
    /// Sole connection every write goes through.
    writer: Mutex<Connection>,
    /// Read-only connections, selected round-robin by `next_reader`.
    readers: Vec<Mutex<Connection>>,
    /// Cursor into `readers` for round-robin selection.
    next_reader: AtomicUsize,
}

impl SqliteLedgerStore {
    /// Opens (creating if absent) the ledger database at `path`, with
    /// `read_pool_size` read-only connections.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when the database cannot be opened,
    /// put into WAL mode, or schema-initialized.
    pub fn open(path: impl AsRef<Path>, read_pool_size: usize) -> Result<Self, LedgerError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let writer = Connection::open(&path).map_err(store_err)?;
        writer
            .pragma_update(None, "journal_mode", "WAL")
            .map_err(store_err)?;
        writer
            .pragma_update(None, "foreign_keys", "ON")
            .map_err(store_err)?;
        schema::initialize(&writer).map_err(store_err)?;

        let mut readers = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let conn = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
            )
            .map_err(store_err)?;
            readers.push(Mutex::new(conn));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Opens an in-memory ledger, for tests and ad hoc CLI runs.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] when schema initialization fails.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let writer = Connection::open_in_memory().map_err(store_err)?;
        schema::initialize(&writer).map_err(store_err)?;
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Runs `f` against the next read-only connection in the pool, or the
    /// writer connection when no pool was configured (in-memory stores).
    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T, LedgerError> {
        if self.readers.is_empty() {
            let conn = self.writer.lock().map_err(|_| LedgerError::Store("writer connection poisoned".to_string()))?;
            return f(&conn).map_err(store_err);
        }
        let index = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|_| LedgerError::Store("reader connection poisoned".to_string()))?;
        f(&conn).map_err(store_err)
    }

    /// Runs `f` against the single writer connection.
    fn with_writer<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T, LedgerError> {
        let conn = self.writer.lock().map_err(|_| LedgerError::Store("writer connection poisoned".to_string()))?;
        f(&conn).map_err(store_err)
    }
}

/// Wraps a raw `rusqlite` error as a [`LedgerError::Store`].
fn store_err(err: rusqlite::Error) -> LedgerError {
    LedgerError::Store(err.to_string())
}

/// Wraps a JSON (de)serialization failure as a [`LedgerError::Store`].
fn json_err(err: serde_json::Error) -> LedgerError {
    LedgerError::Store(format!("json: {err}"))
}

/// Wraps an identifier construction failure as a [`LedgerError::Store`].
fn identifier_err(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::Store(format!("identifier: {err}"))
}

/// Computes the canonical SHA-256 content hash of a serializable value.
fn content_hash<T: serde::Serialize>(value: &T) -> Result<HashDigest, LedgerError> {
    hash_canonical_json(HashAlgorithm::Sha256, value).map_err(|err| LedgerError::Store(err.to_string()))
}

// ============================================================================
// SECTION: DecisionLedger Implementation
// ============================================================================

impl DecisionLedger for SqliteLedgerStore {
    fn append_decision(&self, record: DecisionRecord) -> Result<(), LedgerError> {
        let hash = content_hash(&record.result)?;
        let input_json = serde_json::to_string(&record.input).map_err(json_err)?;
        let result_json = serde_json::to_string(&record.result).map_err(json_err)?;
        let breakdown_json = serde_json::to_string(&record.breakdown).map_err(json_err)?;
        let key_factors_json = serde_json::to_string(&record.key_factors).map_err(json_err)?;
        let variables_json = serde_json::to_string(&record.variables).map_err(json_err)?;
        let shadow_result_json = record
            .shadow_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(json_err)?;

        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO decisions (
                    decision_id, tool_name, rule_version, subject_key, trace_id,
                    tenant_id, input_json, result_json, breakdown_json, confidence, key_factors_json,
                    variables_json, shadow_result_json, shadow_rule_version, experiment_variant,
                    created_at_ms, latency_ms, content_hash
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
                params![
                    record.decision_id.as_str(),
                    record.tool_name.as_str(),
                    record.rule_version.as_str(),
                    record.subject_key.as_str(),
                    record.trace_id.as_str(),
                    record.tenant_id.as_str(),
                    input_json,
                    result_json,
                    breakdown_json,
                    record.confidence,
                    key_factors_json,
                    variables_json,
                    shadow_result_json,
                    record.shadow_rule_version.as_ref().map(RuleVersion::as_str),
                    record.experiment_variant.as_deref(),
                    record.created_at.as_unix_millis(),
                    record.latency_ms,
                    hash.value,
                ],
            )
        })?;
        Ok(())
    }

    fn append_feedback(&self, record: FeedbackRecord) -> Result<(), LedgerError> {
        let detail_json = serde_json::to_string(&record.detail).map_err(json_err)?;
        let outcome = outcome_str(record.outcome);

        self.with_writer(|conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM decisions WHERE decision_id = ?1",
                    params![record.decision_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(Some(record.decision_id.clone()));
            }
            conn.execute(
                "INSERT INTO feedback (feedback_id, decision_id, outcome, detail_json, observed_at_ms)
                 VALUES (?1,?2,?3,?4,?5)",
                params![
                    record.feedback_id.as_str(),
                    record.decision_id.as_str(),
                    outcome,
                    detail_json,
                    record.observed_at.as_unix_millis(),
                ],
            )?;
            Ok(None)
        })
        .and_then(|missing| match missing {
            Some(decision_id) => Err(LedgerError::DecisionNotFound(decision_id.into_inner())),
            None => Ok(()),
        })
    }

    fn assign_variant(&self, assignment: ABAssignment) -> Result<ABAssignment, LedgerError> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO ab_assignments (experiment_id, subject_key, variant, assigned_at_ms)
                 VALUES (?1,?2,?3,?4)",
                params![
                    assignment.experiment_id.as_str(),
                    assignment.subject_key.as_str(),
                    assignment.variant,
                    assignment.assigned_at.as_unix_millis(),
                ],
            )?;
            conn.query_row(
                "SELECT experiment_id, subject_key, variant, assigned_at_ms
                 FROM ab_assignments WHERE experiment_id = ?1 AND subject_key = ?2",
                params![assignment.experiment_id.as_str(), assignment.subject_key.as_str()],
                |row| {
                    let experiment_id: String = row.get(0)?;
                    let subject_key: String = row.get(1)?;
                    let variant: String = row.get(2)?;
                    let assigned_at_ms: i64 = row.get(3)?;
                    Ok((experiment_id, subject_key, variant, assigned_at_ms))
                },
            )
        })
        .and_then(|(experiment_id, subject_key, variant, assigned_at_ms)| {
            Ok(ABAssignment {
                experiment_id: ExperimentId::new(experiment_id).map_err(identifier_err)?,
                subject_key: SubjectKey::new(subject_key).map_err(identifier_err)?,
                variant,
                assigned_at: Timestamp::from_unix_millis(assigned_at_ms),
            })
        })
    }

    fn query_decisions(&self, tool_name: &ToolName, since: Timestamp) -> Result<Vec<DecisionRecord>, LedgerError> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT decision_id, tool_name, rule_version, subject_key, trace_id, tenant_id,
                        input_json, result_json, breakdown_json, confidence, key_factors_json, variables_json,
                        shadow_result_json, shadow_rule_version, experiment_variant,
                        created_at_ms, latency_ms
                 FROM decisions
                 WHERE tool_name = ?1 AND created_at_ms >= ?2
                 ORDER BY created_at_ms ASC",
            )?;
            let rows = stmt.query_map(params![tool_name.as_str(), since.as_unix_millis()], decision_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?
        .into_iter()
        .collect::<Result<Vec<_>, LedgerError>>()
    }

    fn query_feedback(&self, tool_name: &ToolName, since: Timestamp) -> Result<Vec<FeedbackRecord>, LedgerError> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.feedback_id, f.decision_id, f.outcome, f.detail_json, f.observed_at_ms
                 FROM feedback f
                 JOIN decisions d ON d.decision_id = f.decision_id
                 WHERE d.tool_name = ?1 AND f.observed_at_ms >= ?2
                 ORDER BY f.observed_at_ms ASC",
            )?;
            let rows = stmt.query_map(params![tool_name.as_str(), since.as_unix_millis()], feedback_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?
        .into_iter()
        .collect::<Result<Vec<_>, LedgerError>>()
    }

    fn get_decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionRecord>, LedgerError> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT decision_id, tool_name, rule_version, subject_key, trace_id, tenant_id,
                        input_json, result_json, breakdown_json, confidence, key_factors_json, variables_json,
                        shadow_result_json, shadow_rule_version, experiment_variant,
                        created_at_ms, latency_ms
                 FROM decisions
                 WHERE decision_id = ?1",
                params![decision_id.as_str()],
                decision_from_row,
            )
            .optional()
        })?
        .transpose()
    }

    fn feedback_for_decision(&self, decision_id: &DecisionId) -> Result<Vec<FeedbackRecord>, LedgerError> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT feedback_id, decision_id, outcome, detail_json, observed_at_ms
                 FROM feedback
                 WHERE decision_id = ?1
                 ORDER BY observed_at_ms ASC",
            )?;
            let rows = stmt.query_map(params![decision_id.as_str()], feedback_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?
        .into_iter()
        .collect::<Result<Vec<_>, LedgerError>>()
    }

    fn summarize_performance(&self, tool_name: &ToolName, since: Timestamp) -> Result<PerformanceSummary, LedgerError> {
        let decisions = self.query_decisions(tool_name, since)?;
        if decisions.is_empty() {
            return Ok(PerformanceSummary {
                tool_name: tool_name.clone(),
                rule_version: RuleVersion::new("none").map_err(identifier_err)?,
                decision_count: 0,
                feedback_count: 0,
                acceptance_rate: 0.0,
                p95_latency_ms: 0,
            });
        }
        let rule_version = decisions[0].rule_version.clone();
        let decision_count = decisions.len() as u64;

        let mut latencies: Vec<u64> = decisions.iter().map(|d| d.latency_ms).collect();
        latencies.sort_unstable();
        #[allow(clippy::cast_precision_loss, reason = "sample counts never approach f64 mantissa limits")]
        #[allow(clippy::cast_possible_truncation, reason = "ceil() of a small positive value always fits usize")]
        #[allow(clippy::cast_sign_loss, reason = "ceil() of a non-negative value is never negative")]
        let p95_index = ((latencies.len() as f64) * 0.95).ceil() as usize;
        let p95_latency_ms = latencies[p95_index.saturating_sub(1).min(latencies.len() - 1)];

        let decision_ids: Vec<String> = decisions.iter().map(|d| d.decision_id.as_str().to_string()).collect();
        let (feedback_count, accepted_count) = self.with_reader(|conn| {
            let mut total = 0u64;
            let mut accepted = 0u64;
            for decision_id in &decision_ids {
                let mut stmt = conn.prepare("SELECT outcome FROM feedback WHERE decision_id = ?1")?;
                let rows = stmt.query_map(params![decision_id], |row| row.get::<_, String>(0))?;
                for outcome in rows {
                    let outcome = outcome?;
                    total += 1;
                    if outcome == "accepted" {
                        accepted += 1;
                    }
                }
            }
            Ok((total, accepted))
        })?;

        let acceptance_rate = if feedback_count == 0 {
            0.0
        } else {
            accepted_count as f64 / feedback_count as f64
        };

        Ok(PerformanceSummary {
            tool_name: tool_name.clone(),
            rule_version,
            decision_count,
            feedback_count,
            acceptance_rate,
            p95_latency_ms,
        })
    }

    fn lookup_pattern(&self, tool_name: &ToolName, input_hash: &HashDigest) -> Result<Option<PatternCacheEntry>, LedgerError> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT tool_name, rule_version, result_json, cached_at_ms
                 FROM pattern_cache WHERE tool_name = ?1 AND input_hash = ?2",
                params![tool_name.as_str(), input_hash.value],
                |row| {
                    let tool_name: String = row.get(0)?;
                    let rule_version: String = row.get(1)?;
                    let result_json: String = row.get(2)?;
                    let cached_at_ms: i64 = row.get(3)?;
                    Ok((tool_name, rule_version, result_json, cached_at_ms))
                },
            )
            .optional()
        })?
        .map(|(tool_name, rule_version, result_json, cached_at_ms)| {
            Ok(PatternCacheEntry {
                tool_name: ToolName::new(tool_name).map_err(identifier_err)?,
                rule_version: RuleVersion::new(rule_version).map_err(identifier_err)?,
                input_hash: input_hash.clone(),
                result: serde_json::from_str(&result_json).map_err(json_err)?,
                cached_at: Timestamp::from_unix_millis(cached_at_ms),
            })
        })
        .transpose()
    }

    fn store_pattern(&self, entry: PatternCacheEntry) -> Result<(), LedgerError> {
        let result_json = serde_json::to_string(&entry.result).map_err(json_err)?;
        self.with_writer(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO pattern_cache
                    (tool_name, rule_version, input_hash, result_json, cached_at_ms)
                 VALUES (?1,?2,?3,?4,?5)",
                params![
                    entry.tool_name.as_str(),
                    entry.rule_version.as_str(),
                    entry.input_hash.value,
                    result_json,
                    entry.cached_at.as_unix_millis(),
                ],
            )
        })?;
        Ok(())
    }
}

/// Maps a [`FeedbackOutcome`] to its stored column value.
fn outcome_str(outcome: FeedbackOutcome) -> &'static str {
    match outcome {
        FeedbackOutcome::Accepted => "accepted",
        FeedbackOutcome::Rejected => "rejected",
        FeedbackOutcome::Overridden => "overridden",
    }
}

/// Parses a stored outcome column back into a [`FeedbackOutcome`].
fn outcome_from_str(value: &str) -> Result<FeedbackOutcome, LedgerError> {
    match value {
        "accepted" => Ok(FeedbackOutcome::Accepted),
        "rejected" => Ok(FeedbackOutcome::Rejected),
        "overridden" => Ok(FeedbackOutcome::Overridden),
        other => Err(LedgerError::Store(format!("unknown feedback outcome '{other}'"))),
    }
}

/// Reconstructs one [`FeedbackRecord`] from a `feedback` row.
fn feedback_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<FeedbackRecord, LedgerError>> {
    let feedback_id: String = row.get(0)?;
    let decision_id: String = row.get(1)?;
    let outcome: String = row.get(2)?;
    let detail_json: String = row.get(3)?;
    let observed_at_ms: i64 = row.get(4)?;

    Ok((|| -> Result<FeedbackRecord, LedgerError> {
        Ok(FeedbackRecord {
            feedback_id: FeedbackId::new(feedback_id).map_err(identifier_err)?,
            decision_id: DecisionId::new(decision_id).map_err(identifier_err)?,
            outcome: outcome_from_str(&outcome)?,
            detail: serde_json::from_str(&detail_json).map_err(json_err)?,
            observed_at: Timestamp::from_unix_millis(observed_at_ms),
        })
    })())
}

/// Reconstructs one [`DecisionRecord`] from a `decisions` row.
///
/// Returns an outer `rusqlite::Result` for column access failures and an
/// inner [`LedgerError`] for malformed JSON or identifier columns, since
/// only the former can occur while `query_map` is iterating.
fn decision_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<DecisionRecord, LedgerError>> {
    let decision_id: String = row.get(0)?;
    let tool_name: String = row.get(1)?;
    let rule_version: String = row.get(2)?;
    let subject_key: String = row.get(3)?;
    let trace_id: String = row.get(4)?;
    let tenant_id: String = row.get(5)?;
    let input_json: String = row.get(6)?;
    let result_json: String = row.get(7)?;
    let breakdown_json: String = row.get(8)?;
    let confidence: f64 = row.get(9)?;
    let key_factors_json: String = row.get(10)?;
    let variables_json: String = row.get(11)?;
    let shadow_result_json: Option<String> = row.get(12)?;
    let shadow_rule_version: Option<String> = row.get(13)?;
    let experiment_variant: Option<String> = row.get(14)?;
    let created_at_ms: i64 = row.get(15)?;
    let latency_ms_raw: i64 = row.get(16)?;
    #[allow(clippy::cast_sign_loss, reason = "latency is always non-negative")]
    let latency_ms = latency_ms_raw as u64;

    Ok((|| -> Result<DecisionRecord, LedgerError> {
        Ok(DecisionRecord {
            decision_id: DecisionId::new(decision_id).map_err(identifier_err)?,
            tool_name: ToolName::new(tool_name).map_err(identifier_err)?,
            rule_version: RuleVersion::new(rule_version).map_err(identifier_err)?,
            subject_key: SubjectKey::new(subject_key).map_err(identifier_err)?,
            trace_id: TraceId::new(trace_id).map_err(identifier_err)?,
            tenant_id: TenantId::new(tenant_id).map_err(identifier_err)?,
            input: serde_json::from_str(&input_json).map_err(json_err)?,
            result: serde_json::from_str(&result_json).map_err(json_err)?,
            breakdown: serde_json::from_str(&breakdown_json).map_err(json_err)?,
            confidence,
            key_factors: serde_json::from_str(&key_factors_json).map_err(json_err)?,
            variables: serde_json::from_str(&variables_json).map_err(json_err)?,
            shadow_result: shadow_result_json.map(|s| serde_json::from_str(&s)).transpose().map_err(json_err)?,
            shadow_rule_version: shadow_rule_version.map(RuleVersion::new).transpose().map_err(identifier_err)?,
            experiment_variant,
            created_at: Timestamp::from_unix_millis(created_at_ms),
            latency_ms,
        })
    })())
}
