// crates/scoring-broker/src/broker.rs
// ============================================================================
// Module: Broker Ledger
// Description: Bounded-queue, single-worker dispatch of ledger writes.
// Purpose: Give the Decision Executor a DecisionLedger whose writes never
//          block or fail the caller's thread.
// Dependencies: scoring-core, std::sync::mpsc, std::thread
// ============================================================================

//! ## Overview
//! One worker thread owns the inner [`DecisionLedger`] and drains a bounded
//! `std::sync::mpsc` queue of pending writes. `try_send` on the caller's
//! thread either enqueues the write or, on `Full`, drops it and increments
//! the matching counter in [`DropCounters`] — this is the concrete
//! mechanism behind "bounded lock-free ledger queue with backpressure that
//! drops the secondary log first, then the primary log as a last resort."

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::TrySendError;
use std::thread;

use scoring_core::ABAssignment;
use scoring_core::ConfigEvent;
use scoring_core::DecisionEventSink;
use scoring_core::DecisionId;
use scoring_core::DecisionLedger;
use scoring_core::DecisionRecord;
use scoring_core::FeedbackRecord;
use scoring_core::LedgerError;
use scoring_core::PatternCacheEntry;
use scoring_core::PerformanceSummary;
use scoring_core::Timestamp;
use scoring_core::ToolName;
use scoring_core::events::Severity;
use scoring_core::hashing::HashDigest;
use serde_json::json;

// ============================================================================
// SECTION: Drop Counters
// ============================================================================

/// Lock-free counters for writes dropped under queue backpressure.
#[derive(Debug, Default)]
pub struct DropCounters {
    decisions: AtomicU64,
    feedback: AtomicU64,
    patterns: AtomicU64,
}

/// A point-in-time read of [`DropCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropCountersSnapshot {
    /// Decisions dropped under backpressure.
    pub decisions: u64,
    /// Feedback entries dropped under backpressure.
    pub feedback: u64,
    /// Pattern cache entries dropped under backpressure.
    pub patterns: u64,
}

impl DropCounters {
    /// Returns a point-in-time snapshot of every counter.
    #[must_use]
    pub fn snapshot(&self) -> DropCountersSnapshot {
        DropCountersSnapshot {
            decisions: self.decisions.load(Ordering::Relaxed),
            feedback: self.feedback.load(Ordering::Relaxed),
            patterns: self.patterns.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// SECTION: Jobs
// ============================================================================

/// A single queued ledger write.
enum LedgerJob {
    AppendDecision(Box<DecisionRecord>),
    AppendFeedback(Box<FeedbackRecord>),
    StorePattern(Box<PatternCacheEntry>),
}

// ============================================================================
// SECTION: Broker Ledger
// ============================================================================

/// Decorates a [`DecisionLedger`] so its write operations run off the
/// caller's thread.
///
/// # Invariants
/// - Write operations never return an error to the caller: a dropped write
///   under backpressure is reported through the event sink and counted, not
///   propagated as a failure.
/// - Read operations delegate directly to the inner ledger; this type adds
///   no caching or staleness to reads.
pub struct BrokerLedger {
    sender: SyncSender<LedgerJob>,
    inner: Arc<dyn DecisionLedger>,
    sink: Arc<dyn DecisionEventSink>,
    drops: Arc<DropCounters>,
}

impl BrokerLedger {
    /// Spawns the worker thread and returns a broker-backed ledger.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-capacity queue can never accept
    /// a write and is always a configuration mistake, not a runtime
    /// condition to handle gracefully.
    #[must_use]
    pub fn spawn(inner: Arc<dyn DecisionLedger>, sink: Arc<dyn DecisionEventSink>, capacity: usize) -> Self {
        assert!(capacity > 0, "broker ledger queue capacity must be greater than zero");
        let (sender, receiver) = mpsc::sync_channel::<LedgerJob>(capacity);
        let worker_inner = Arc::clone(&inner);
        let worker_sink = Arc::clone(&sink);
        thread::spawn(move || {
            for job in receiver {
                run_job(&worker_inner, &worker_sink, job);
            }
        });
        Self { sender, inner, sink, drops: Arc::new(DropCounters::default()) }
    }

    /// Returns a snapshot of writes dropped under queue backpressure so far.
    #[must_use]
    pub fn dropped(&self) -> DropCountersSnapshot {
        self.drops.snapshot()
    }

    /// Attempts to enqueue a job, counting and logging a drop on `Full`.
    fn dispatch(&self, job: LedgerJob, kind: &'static str, counter: impl FnOnce(&DropCounters)) {
        if let Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) = self.sender.try_send(job) {
            counter(&self.drops);
            self.sink.record_config(ConfigEvent {
                severity: Severity::Warn,
                kind: "ledger_write_dropped".to_owned(),
                detail: json!({ "write_kind": kind }),
            });
        }
    }
}

/// Runs one queued job against the inner ledger, logging failures.
fn run_job(inner: &Arc<dyn DecisionLedger>, sink: &Arc<dyn DecisionEventSink>, job: LedgerJob) {
    let result = match job {
        LedgerJob::AppendDecision(record) => inner.append_decision(*record),
        LedgerJob::AppendFeedback(record) => inner.append_feedback(*record),
        LedgerJob::StorePattern(entry) => inner.store_pattern(*entry),
    };
    if let Err(err) = result {
        sink.record_config(ConfigEvent {
            severity: Severity::Error,
            kind: "ledger_write_failed".to_owned(),
            detail: json!({ "detail": err.to_string() }),
        });
    }
}

impl DecisionLedger for BrokerLedger {
    fn append_decision(&self, record: DecisionRecord) -> Result<(), LedgerError> {
        self.dispatch(LedgerJob::AppendDecision(Box::new(record)), "decision", |counters| {
            counters.decisions.fetch_add(1, Ordering::Relaxed);
        });
        Ok(())
    }

    fn append_feedback(&self, record: FeedbackRecord) -> Result<(), LedgerError> {
        self.dispatch(LedgerJob::AppendFeedback(Box::new(record)), "feedback", |counters| {
            counters.feedback.fetch_add(1, Ordering::Relaxed);
        });
        Ok(())
    }

    fn assign_variant(&self, assignment: ABAssignment) -> Result<ABAssignment, LedgerError> {
        self.inner.assign_variant(assignment)
    }

    fn query_decisions(&self, tool_name: &ToolName, since: Timestamp) -> Result<Vec<DecisionRecord>, LedgerError> {
        self.inner.query_decisions(tool_name, since)
    }

    fn query_feedback(&self, tool_name: &ToolName, since: Timestamp) -> Result<Vec<FeedbackRecord>, LedgerError> {
        self.inner.query_feedback(tool_name, since)
    }

    fn get_decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionRecord>, LedgerError> {
        self.inner.get_decision(decision_id)
    }

    fn feedback_for_decision(&self, decision_id: &DecisionId) -> Result<Vec<FeedbackRecord>, LedgerError> {
        self.inner.feedback_for_decision(decision_id)
    }

    fn summarize_performance(&self, tool_name: &ToolName, since: Timestamp) -> Result<PerformanceSummary, LedgerError> {
        self.inner.summarize_performance(tool_name, since)
    }

    fn lookup_pattern(&self, tool_name: &ToolName, input_hash: &HashDigest) -> Result<Option<PatternCacheEntry>, LedgerError> {
        self.inner.lookup_pattern(tool_name, input_hash)
    }

    fn store_pattern(&self, entry: PatternCacheEntry) -> Result<(), LedgerError> {
        self.dispatch(LedgerJob::StorePattern(Box::new(entry)), "pattern", |counters| {
            counters.patterns.fetch_add(1, Ordering::Relaxed);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use scoring_core::DecisionId;
    use scoring_core::ExperimentId;
    use scoring_core::NoopEventSink;
    use scoring_core::RuleVersion;
    use scoring_core::SubjectKey;
    use scoring_core::TenantId;
    use scoring_core::TraceId;
    use serde_json::json;

    use super::*;

    struct RecordingLedger {
        decisions: Mutex<Vec<DecisionRecord>>,
    }

    impl RecordingLedger {
        fn new() -> Self {
            Self { decisions: Mutex::new(Vec::new()) }
        }
    }

    fn sample_decision(id: &str) -> DecisionRecord {
        DecisionRecord {
            decision_id: DecisionId::new(id).expect("decision id"),
            tool_name: ToolName::new("company_quality").expect("tool"),
            rule_version: RuleVersion::new("v1").expect("version"),
            subject_key: SubjectKey::new("acme").expect("subject"),
            trace_id: TraceId::new("trace-1").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            input: json!({}),
            result: json!({"score": 1.0}),
            breakdown: Vec::new(),
            confidence: 1.0,
            key_factors: Vec::new(),
            variables: json!({}),
            shadow_result: None,
            shadow_rule_version: None,
            experiment_variant: None,
            created_at: Timestamp::from_unix_millis(0),
            latency_ms: 1,
        }
    }

    impl DecisionLedger for RecordingLedger {
        fn append_decision(&self, record: DecisionRecord) -> Result<(), LedgerError> {
            self.decisions.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(record);
            Ok(())
        }

        fn append_feedback(&self, _record: FeedbackRecord) -> Result<(), LedgerError> {
            Ok(())
        }

        fn assign_variant(&self, assignment: ABAssignment) -> Result<ABAssignment, LedgerError> {
            Ok(assignment)
        }

        fn query_decisions(&self, _tool_name: &ToolName, _since: Timestamp) -> Result<Vec<DecisionRecord>, LedgerError> {
            Ok(self.decisions.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone())
        }

        fn query_feedback(&self, _tool_name: &ToolName, _since: Timestamp) -> Result<Vec<FeedbackRecord>, LedgerError> {
            Ok(Vec::new())
        }

        fn get_decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionRecord>, LedgerError> {
            Ok(self
                .decisions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .iter()
                .find(|record| &record.decision_id == decision_id)
                .cloned())
        }

        fn feedback_for_decision(&self, _decision_id: &DecisionId) -> Result<Vec<FeedbackRecord>, LedgerError> {
            Ok(Vec::new())
        }

        fn summarize_performance(&self, tool_name: &ToolName, _since: Timestamp) -> Result<PerformanceSummary, LedgerError> {
            Ok(PerformanceSummary {
                tool_name: tool_name.clone(),
                rule_version: RuleVersion::new("v1").expect("version"),
                decision_count: 0,
                feedback_count: 0,
                acceptance_rate: 0.0,
                p95_latency_ms: 0,
            })
        }

        fn lookup_pattern(&self, _tool_name: &ToolName, _input_hash: &HashDigest) -> Result<Option<PatternCacheEntry>, LedgerError> {
            Ok(None)
        }

        fn store_pattern(&self, _entry: PatternCacheEntry) -> Result<(), LedgerError> {
            Ok(())
        }
    }

    #[test]
    fn append_decision_reaches_the_inner_ledger_eventually() {
        let inner = Arc::new(RecordingLedger::new());
        let broker = BrokerLedger::spawn(Arc::clone(&inner) as Arc<dyn DecisionLedger>, Arc::new(NoopEventSink), 4);
        broker.append_decision(sample_decision("dec-1")).expect("enqueue");

        let mut seen = false;
        for _ in 0 .. 50 {
            if !inner.decisions.lock().unwrap_or_else(std::sync::PoisonError::into_inner).is_empty() {
                seen = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(seen, "decision should have been written by the worker thread");
    }

    #[test]
    fn a_full_queue_drops_rather_than_blocks_or_fails() {
        let inner = Arc::new(RecordingLedger::new());
        let broker = BrokerLedger::spawn(Arc::clone(&inner) as Arc<dyn DecisionLedger>, Arc::new(NoopEventSink), 1);
        for index in 0 .. 1_000 {
            broker.append_decision(sample_decision(&format!("dec-{index}"))).expect("never errors");
        }
        assert!(broker.dropped().decisions > 0 || !inner.decisions.lock().unwrap_or_else(std::sync::PoisonError::into_inner).is_empty());
    }

    #[test]
    fn reads_delegate_directly_to_the_inner_ledger() {
        let inner = Arc::new(RecordingLedger::new());
        let broker = BrokerLedger::spawn(Arc::clone(&inner) as Arc<dyn DecisionLedger>, Arc::new(NoopEventSink), 4);
        let assignment = ABAssignment {
            experiment_id: ExperimentId::new("exp-1").expect("experiment"),
            subject_key: SubjectKey::new("acme").expect("subject"),
            variant: "control".to_owned(),
            assigned_at: Timestamp::from_unix_millis(0),
        };
        let resolved = broker.assign_variant(assignment.clone()).expect("assign");
        assert_eq!(resolved, assignment);
    }
}
