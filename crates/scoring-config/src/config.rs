// crates/scoring-config/src/config.rs
// ============================================================================
// Module: Scoring Config Model
// Description: The process-wide configuration aggregate and its validation.
// Purpose: Load once at process start, validate exhaustively, and stay
//          immutable for the life of the process.
// Dependencies: scoring-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`ScoringConfig`] aggregates every setting the engine needs that is not
//! itself a rule document: where rule documents live, how the ledger is
//! persisted, how the broker sizes its queues, the per-tool SLA class, and
//! the declared A/B experiments. Unlike rule documents (validated once per
//! document, at load time, and cheaply revalidated on refresh), this
//! configuration is validated exhaustively once and never refreshed — a
//! changed deployment restarts the process rather than hot-swapping config.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use scoring_core::ExperimentId;
use scoring_core::RuleVersion;
use scoring_core::ToolName;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating a [`ScoringConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read from disk.
    #[error("failed to read config file '{path}': {detail}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error text.
        detail: String,
    },
    /// The configuration file was not valid TOML, or did not match the
    /// expected shape.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// A structural precondition failed (e.g. a zero capacity, an unknown
    /// tool name in an SLA override, a dangling experiment reference).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Rule Source Configuration
// ============================================================================

/// Where the Rule Store's backing [`scoring_core::RuleSource`] reads
/// documents from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSourceConfig {
    /// One JSON document per `(tool_name, version)` under a root directory.
    FileTree {
        /// Root directory containing `<tool_name>/<version>.json` files.
        root: PathBuf,
    },
    /// The `rule_versions` table of the SQLite ledger database.
    Sqlite {
        /// Path to the SQLite database file.
        path: PathBuf,
    },
}

// ============================================================================
// SECTION: Ledger Store Configuration
// ============================================================================

/// `SQLite` journal mode for the ledger database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log; recommended for concurrent readers.
    #[default]
    Wal,
    /// Classic rollback-journal mode.
    Delete,
}

impl JournalMode {
    /// Returns the `PRAGMA journal_mode` value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// Configuration for the durable decision ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Journal mode for the writer connection.
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Number of read-only connections in the reader pool.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
    /// Capacity of the writer's bounded command queue.
    #[serde(default = "default_writer_queue_capacity")]
    pub writer_queue_capacity: usize,
}

const fn default_read_pool_size() -> usize {
    4
}

const fn default_writer_queue_capacity() -> usize {
    1_024
}

// ============================================================================
// SECTION: Broker Configuration
// ============================================================================

/// Queue sizing for the off-thread secondary-evaluation and ledger-append
/// dispatch broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Bounded channel capacity for secondary (shadow/A-B) evaluation jobs.
    #[serde(default = "default_secondary_queue_capacity")]
    pub secondary_queue_capacity: usize,
    /// Bounded channel capacity for ledger-append jobs.
    #[serde(default = "default_ledger_queue_capacity")]
    pub ledger_queue_capacity: usize,
}

const fn default_secondary_queue_capacity() -> usize {
    256
}

const fn default_ledger_queue_capacity() -> usize {
    512
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            secondary_queue_capacity: default_secondary_queue_capacity(),
            ledger_queue_capacity: default_ledger_queue_capacity(),
        }
    }
}

// ============================================================================
// SECTION: SLA Configuration
// ============================================================================

/// Deadline class declared for a tool, per the concurrency model's two
/// service tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaClass {
    /// p95 <= 2s: `CompanyQuality`, `ContactTier`, `TimingScore`.
    Strict,
    /// p95 <= 5s: `BankingProductMatch`, `CompositeScore`.
    Assisted,
}

impl SlaClass {
    /// Returns the deadline in milliseconds for this class.
    #[must_use]
    pub const fn deadline_ms(self) -> u64 {
        match self {
            Self::Strict => 2_000,
            Self::Assisted => 5_000,
        }
    }
}

// ============================================================================
// SECTION: Experiment Configuration
// ============================================================================

/// A declared A/B experiment over one tool's rule versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Tool this experiment runs against.
    pub tool_name: ToolName,
    /// Variant label to rule version mapping; must have at least two
    /// entries for the experiment to be meaningful.
    pub variants: BTreeMap<String, RuleVersion>,
}

// ============================================================================
// SECTION: Scoring Config
// ============================================================================

/// The process-wide configuration aggregate.
///
/// # Invariants
/// - Loaded once at process start and never mutated; a configuration change
///   requires a process restart (rule snapshots, not configuration, are the
///   only thing this engine refreshes in place).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Where rule documents are resolved from.
    pub rule_source: RuleSourceConfig,
    /// Ledger persistence configuration.
    pub ledger: LedgerStoreConfig,
    /// Broker queue sizing.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Per-tool SLA class overrides; tools not listed default to
    /// [`SlaClass::Strict`] except `BankingProductMatch` and
    /// `CompositeScore`, which default to [`SlaClass::Assisted`].
    #[serde(default)]
    pub sla_overrides: BTreeMap<ToolName, SlaClass>,
    /// Declared A/B experiments, keyed by experiment id.
    #[serde(default)]
    pub experiments: BTreeMap<ExperimentId, ExperimentConfig>,
    /// HTTP bind address for `scoring-api`, e.g. `"0.0.0.0:8080"`.
    pub bind: String,
    /// Feedback Analyzer's recomputation period, in seconds.
    #[serde(default = "default_feedback_interval_secs")]
    pub feedback_interval_secs: u64,
}

const fn default_feedback_interval_secs() -> u64 {
    300
}

impl ScoringConfig {
    /// Parses a configuration from TOML bytes, without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the bytes are not valid TOML or
    /// do not match the expected shape.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads and parses a configuration file from disk, without validating
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, or
    /// [`ConfigError::Parse`] when its contents are not valid TOML.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Returns the declared SLA class for `tool`, honoring
    /// [`Self::sla_overrides`] before the domain default.
    #[must_use]
    pub fn sla_class(&self, tool: &ToolName) -> SlaClass {
        if let Some(class) = self.sla_overrides.get(tool) {
            return *class;
        }
        match tool.as_str() {
            "banking_product_match" | "composite_score" => SlaClass::Assisted,
            _ => SlaClass::Strict,
        }
    }

    /// Validates every structural precondition this configuration must
    /// satisfy before the process starts serving traffic.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation
    /// found. Unlike rule-document validation, this does not collect every
    /// violation at once — a misconfigured process should not start at all,
    /// and one clear message is enough to fix and retry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("bind address must not be empty".to_owned()));
        }
        if self.ledger.read_pool_size == 0 {
            return Err(ConfigError::Invalid("ledger.read_pool_size must be greater than zero".to_owned()));
        }
        if self.ledger.writer_queue_capacity == 0 {
            return Err(ConfigError::Invalid("ledger.writer_queue_capacity must be greater than zero".to_owned()));
        }
        if self.broker.secondary_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broker.secondary_queue_capacity must be greater than zero".to_owned(),
            ));
        }
        if self.broker.ledger_queue_capacity == 0 {
            return Err(ConfigError::Invalid("broker.ledger_queue_capacity must be greater than zero".to_owned()));
        }
        if self.feedback_interval_secs == 0 {
            return Err(ConfigError::Invalid("feedback_interval_secs must be greater than zero".to_owned()));
        }
        if let RuleSourceConfig::FileTree { root } = &self.rule_source
            && root.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid("rule_source file tree root must not be empty".to_owned()));
        }
        for (experiment_id, experiment) in &self.experiments {
            if experiment.variants.len() < 2 {
                return Err(ConfigError::Invalid(format!(
                    "experiment '{experiment_id}' declares fewer than two variants"
                )));
            }
        }
        Ok(())
    }
}
