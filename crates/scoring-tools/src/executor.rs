// crates/scoring-tools/src/executor.rs
// ============================================================================
// Module: Decision Executor
// Description: The seven-step procedure that turns a tool call into a
//              logged, explained decision.
// Purpose: Validate input, resolve the right rule version (production,
//          shadow, or A/B variant), evaluate it, validate the result, log
//          it, and hand back a fully explained outcome.
// Dependencies: jsonschema, scoring-contract, scoring-core
// ============================================================================

//! ## Overview
//! [`DecisionExecutor::execute`] runs the seven steps in order: (1) resolve
//! the tool's contract through the [`crate::registry::ToolRegistry`]; (2)
//! validate the input payload against the contract's input schema; (3)
//! resolve the rule document to evaluate — the tool's production version,
//! or an A/B variant's version when an experiment is configured; (4)
//! evaluate the primary rule named `"result"`, applying edge cases; (5)
//! validate the result against the contract's output schema; (6) evaluate
//! the tool's shadow version, if one is configured, best-effort; (7) append
//! a [`scoring_core::DecisionRecord`] to the ledger and emit a
//! [`scoring_core::DecisionEvent`], neither of which can fail the call —
//! a broken ledger or event sink degrades observability, not correctness.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonschema::Draft;
use scoring_core::ConfigEvent;
use scoring_core::DecisionEvent;
use scoring_core::DecisionEventSink;
use scoring_core::DecisionId;
use scoring_core::DecisionLedger;
use scoring_core::DecisionRecord;
use scoring_core::EvaluationContext;
use scoring_core::EvaluationOutcome;
use scoring_core::ExecutorError;
use scoring_core::ExperimentId;
use scoring_core::RuleStore;
use scoring_core::RuleVersion;
use scoring_core::SchemaValidationError;
use scoring_core::SchemaViolation;
use scoring_core::SubjectKey;
use scoring_core::TenantId;
use scoring_core::ToolName;
use scoring_core::TraceId;
use scoring_core::evaluate_primary;
use scoring_core::events::Severity;
use scoring_core::hashing::HashAlgorithm;
use scoring_core::hashing::hash_bytes;
use serde_json::Value;
use serde_json::json;

use crate::clock::Clock;
use crate::registry::RegistryError;
use crate::registry::ToolRegistry;

/// Name every rule document's designated primary rule must use.
///
/// # Invariants
/// - The Rule Store does not enforce this; a document missing a rule named
///   `"result"` surfaces as [`scoring_core::EvaluationError::UndefinedVariable`]
///   the first time it is evaluated, which the executor propagates as
///   [`ExecutorError::Evaluation`].
pub const PRIMARY_RULE_NAME: &str = "result";

// ============================================================================
// SECTION: Request And Response
// ============================================================================

/// An A/B experiment configuration applied to one tool call.
#[derive(Debug, Clone)]
pub struct ExperimentRequest {
    /// Identifier of the experiment the caller is routed through.
    pub experiment_id: ExperimentId,
    /// Rule version for each named variant, at least one entry.
    pub variants: BTreeMap<String, RuleVersion>,
}

/// One tool call to evaluate and log.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    /// Tool being called.
    pub tool_name: ToolName,
    /// Raw input payload, validated against the tool's input schema.
    pub input: Value,
    /// Subject the decision concerns, used for A/B bucketing.
    pub subject_key: SubjectKey,
    /// Per-request trace identifier.
    pub trace_id: TraceId,
    /// Tenant the call was made on behalf of.
    pub tenant_id: TenantId,
    /// Identifier to log this decision under.
    pub decision_id: DecisionId,
    /// Experiment routing, when the tool has an active A/B test.
    pub experiment: Option<ExperimentRequest>,
}

/// The logged, explained result of one tool call.
#[derive(Debug, Clone)]
pub struct ExecuteResponse {
    /// Identifier the decision was logged under.
    pub decision_id: DecisionId,
    /// Final result value, after edge cases were applied.
    pub result: Value,
    /// Complete evaluation outcome, including the explanation trail.
    pub outcome: EvaluationOutcome,
    /// `true` when a shadow evaluation ran alongside the primary one.
    pub shadow_evaluated: bool,
    /// Primary evaluation latency, in milliseconds.
    pub latency_ms: u64,
}

// ============================================================================
// SECTION: Decision Executor
// ============================================================================

/// Evaluates tool calls against the rule store and logs the result.
pub struct DecisionExecutor {
    registry: ToolRegistry,
    store: Arc<RuleStore>,
    ledger: Arc<dyn DecisionLedger>,
    sink: Arc<dyn DecisionEventSink>,
    clock: Arc<dyn Clock>,
}

impl DecisionExecutor {
    /// Constructs a new executor over the given backing services.
    #[must_use]
    pub fn new(
        registry: ToolRegistry,
        store: Arc<RuleStore>,
        ledger: Arc<dyn DecisionLedger>,
        sink: Arc<dyn DecisionEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { registry, store, ledger, sink, clock }
    }

    /// Runs the full seven-step decision procedure for one tool call.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Configuration`] when the tool is unknown or
    /// policy-blocked, [`ExecutorError::Validation`] when the input or
    /// result fails its schema, [`ExecutorError::Store`] when the rule
    /// document cannot be resolved, and [`ExecutorError::Evaluation`] when
    /// the interpreter fails.
    pub fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, ExecutorError> {
        let contract = self
            .registry
            .resolve(&request.tool_name)
            .map_err(|err: RegistryError| ExecutorError::Configuration(err.to_string()))?;

        validate_against_schema(&contract.input_schema, &request.input, "input")?;

        let started = self.clock.now_monotonic();

        let rule_version = self.resolve_rule_version(&request)?;
        let document = self.store.get(&request.tool_name, &rule_version)?;

        let inputs = object_to_map(&request.input);
        let ctx = EvaluationContext::new(inputs.clone());
        let outcome = evaluate_primary(&document, PRIMARY_RULE_NAME, ctx)?;

        validate_against_schema(&contract.output_schema, &outcome.result, "output")?;

        let shadow_result = self.evaluate_shadow(&request.tool_name, &inputs);
        let shadow_evaluated = shadow_result.is_some();

        let finished = self.clock.now_monotonic();
        let latency_ms = finished.elapsed_millis_since(started);

        self.log_decision(&request, &outcome, shadow_result, latency_ms);
        self.sink.record_decision(DecisionEvent {
            tool: request.tool_name.clone(),
            decision_id: Some(request.decision_id.clone()),
            trace_id: request.trace_id.clone(),
            severity: Severity::Debug,
            latency_ms,
            shadow: false,
            detail: json!({"rule_version": outcome.rule_version.as_str()}),
        });

        Ok(ExecuteResponse {
            decision_id: request.decision_id,
            result: outcome.result.clone(),
            outcome,
            shadow_evaluated,
            latency_ms,
        })
    }

    /// Resolves the rule version to evaluate: an A/B variant's version when
    /// an experiment is configured, otherwise the tool's production
    /// version.
    fn resolve_rule_version(&self, request: &ExecuteRequest) -> Result<RuleVersion, ExecutorError> {
        match &request.experiment {
            None => Ok(self.store.production(&request.tool_name)?.metadata.version.clone()),
            Some(experiment) => {
                let variant = assign_variant(&experiment.experiment_id, &request.subject_key, &experiment.variants);
                experiment.variants.get(&variant).cloned().ok_or_else(|| {
                    ExecutorError::Configuration(format!(
                        "experiment '{}' assigned variant '{variant}' with no rule version",
                        experiment.experiment_id
                    ))
                })
            }
        }
    }

    /// Evaluates the tool's shadow rule version against the same inputs,
    /// best-effort. A missing shadow version or a shadow evaluation failure
    /// is logged and swallowed; it never affects the primary result.
    fn evaluate_shadow(&self, tool_name: &ToolName, inputs: &BTreeMap<String, Value>) -> Option<EvaluationOutcome> {
        let shadow_document = match self.store.shadow(tool_name) {
            Ok(Some(document)) => document,
            Ok(None) => return None,
            Err(err) => {
                self.sink.record_config(ConfigEvent {
                    severity: Severity::Warn,
                    kind: "shadow_unavailable".to_owned(),
                    detail: json!({"tool": tool_name.as_str(), "detail": err.to_string()}),
                });
                return None;
            }
        };

        let ctx = EvaluationContext::new(inputs.clone());
        match evaluate_primary(&shadow_document, PRIMARY_RULE_NAME, ctx) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.sink.record_config(ConfigEvent {
                    severity: Severity::Warn,
                    kind: "shadow_evaluation_failed".to_owned(),
                    detail: json!({"tool": tool_name.as_str(), "detail": err.to_string()}),
                });
                None
            }
        }
    }

    /// Appends a decision record to the ledger, best-effort: a store
    /// failure is logged as a configuration event rather than failing the
    /// call the caller is waiting on.
    fn log_decision(
        &self,
        request: &ExecuteRequest,
        outcome: &EvaluationOutcome,
        shadow: Option<EvaluationOutcome>,
        latency_ms: u64,
    ) {
        let record = DecisionRecord {
            decision_id: request.decision_id.clone(),
            tool_name: request.tool_name.clone(),
            rule_version: outcome.rule_version.clone(),
            subject_key: request.subject_key.clone(),
            trace_id: request.trace_id.clone(),
            tenant_id: request.tenant_id.clone(),
            input: request.input.clone(),
            result: outcome.result.clone(),
            breakdown: outcome.breakdown.clone(),
            confidence: outcome.confidence,
            key_factors: outcome.key_factors.clone(),
            variables: json!(outcome.variables),
            shadow_result: shadow.as_ref().map(|shadow| shadow.result.clone()),
            shadow_rule_version: shadow.map(|shadow| shadow.rule_version),
            experiment_variant: request.experiment.as_ref().map(|experiment| {
                assign_variant(&experiment.experiment_id, &request.subject_key, &experiment.variants)
            }),
            created_at: self.clock.now_wall(),
            latency_ms,
        };

        if let Err(err) = self.ledger.append_decision(record) {
            self.sink.record_config(ConfigEvent {
                severity: Severity::Error,
                kind: "ledger_append_failed".to_owned(),
                detail: json!({"tool": request.tool_name.as_str(), "detail": err.to_string()}),
            });
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Deterministically assigns a subject to one of an experiment's variants by
/// hashing `(experiment_id, subject_key)` and indexing into the variants in
/// sorted-key order.
///
/// # Panics
///
/// Panics if `variants` is empty; callers must not configure an experiment
/// with zero variants.
#[expect(clippy::missing_panics_doc, reason = "documented above; empty variants is a caller configuration error")]
#[must_use]
pub fn assign_variant(experiment_id: &ExperimentId, subject_key: &SubjectKey, variants: &BTreeMap<String, RuleVersion>) -> String {
    assert!(!variants.is_empty(), "experiment must declare at least one variant");
    let seed = format!("{experiment_id}:{subject_key}");
    let digest = hash_bytes(HashAlgorithm::Sha256, seed.as_bytes());
    let bucket = u64::from_str_radix(&digest.value[..16], 16).unwrap_or(0);
    #[expect(clippy::cast_possible_truncation, reason = "variants.len() is always small")]
    let index = (bucket % variants.len() as u64) as usize;
    variants.keys().nth(index).cloned().unwrap_or_else(|| unreachable!("index bounded by variants.len()"))
}

/// Converts a JSON object payload into a flat string-keyed map for
/// [`EvaluationContext::new`]; a non-object payload yields an empty map,
/// which schema validation (run before this is called) would already have
/// rejected.
fn object_to_map(input: &Value) -> BTreeMap<String, Value> {
    input.as_object().map(|object| object.clone().into_iter().collect()).unwrap_or_default()
}

/// Compiles `schema` and validates `value` against it, mapping any
/// violation into a [`SchemaValidationError`].
fn validate_against_schema(schema: &Value, value: &Value, field_prefix: &str) -> Result<(), ExecutorError> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| ExecutorError::Configuration(format!("invalid {field_prefix} schema: {err}")))?;

    let violations: Vec<SchemaViolation> = compiled
        .iter_errors(value)
        .map(|err| SchemaViolation { field: err.instance_path.to_string(), message: err.to_string() })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ExecutorError::Validation(SchemaValidationError { violations }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use scoring_core::ABAssignment;
    use scoring_core::FeedbackRecord;
    use scoring_core::HashDigest;
    use scoring_core::LedgerError;
    use scoring_core::MonotonicInstant;
    use scoring_core::NoopEventSink;
    use scoring_core::PatternCacheEntry;
    use scoring_core::PerformanceSummary;
    use scoring_core::RuleSource;
    use scoring_core::RuleStoreError;
    use scoring_core::Timestamp;

    use super::*;
    use crate::registry::ToolAccessPolicy;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_wall(&self) -> Timestamp {
            Timestamp::from_unix_millis(1_700_000_000_000)
        }

        fn now_monotonic(&self) -> MonotonicInstant {
            MonotonicInstant::from_nanos(0)
        }
    }

    struct InMemoryLedger {
        decisions: Mutex<Vec<DecisionRecord>>,
    }

    impl DecisionLedger for InMemoryLedger {
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

    struct SingleVersionSource {
        document: scoring_core::RuleDocument,
    }

    impl RuleSource for SingleVersionSource {
        fn load(&self, _tool: &ToolName, _version: &RuleVersion) -> Result<scoring_core::RuleDocument, RuleStoreError> {
            Ok(self.document.clone())
        }

        fn production_version(&self, _tool: &ToolName) -> Result<RuleVersion, RuleStoreError> {
            Ok(self.document.metadata.version.clone())
        }

        fn shadow_version(&self, _tool: &ToolName) -> Result<Option<RuleVersion>, RuleStoreError> {
            Ok(None)
        }
    }

    fn company_quality_document() -> scoring_core::RuleDocument {
        serde_json::from_str(include_str!("../../../rules/company_quality/v1.json")).expect("fixture document")
    }

    fn contact_tier_document() -> scoring_core::RuleDocument {
        serde_json::from_str(include_str!("../../../rules/contact_tier/v1.json")).expect("fixture document")
    }

    fn timing_score_document() -> scoring_core::RuleDocument {
        serde_json::from_str(include_str!("../../../rules/timing_score/v1.json")).expect("fixture document")
    }

    fn banking_product_match_document() -> scoring_core::RuleDocument {
        serde_json::from_str(include_str!("../../../rules/banking_product_match/v1.json")).expect("fixture document")
    }

    fn composite_score_document() -> scoring_core::RuleDocument {
        serde_json::from_str(include_str!("../../../rules/composite_score/v1.json")).expect("fixture document")
    }

    fn executor_for(document: scoring_core::RuleDocument) -> DecisionExecutor {
        let registry = ToolRegistry::new(ToolAccessPolicy::allow_all());
        let store = Arc::new(RuleStore::new(Box::new(SingleVersionSource { document })));
        let ledger = Arc::new(InMemoryLedger { decisions: Mutex::new(Vec::new()) });
        DecisionExecutor::new(registry, store, ledger, Arc::new(NoopEventSink), Arc::new(FixedClock))
    }

    fn executor() -> DecisionExecutor {
        executor_for(company_quality_document())
    }

    fn sample_request() -> ExecuteRequest {
        ExecuteRequest {
            tool_name: ToolName::new("company_quality").expect("tool name"),
            input: json!({
                "name": "TechCorp UAE",
                "industry": "Technology",
                "size": 150,
                "license_type": "Free Zone",
                "sector": "Private"
            }),
            subject_key: SubjectKey::new("acme-co").expect("subject"),
            trace_id: TraceId::new("trace-1").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            decision_id: DecisionId::new("dec-1").expect("decision id"),
            experiment: None,
        }
    }

    #[test]
    fn execute_returns_validated_result() {
        let response = executor().execute(sample_request()).expect("execute");
        assert_eq!(response.result["quality_tier"], json!("TIER_1"));
        assert_eq!(response.result["score"], json!(90.0));
        assert_eq!(response.result["confidence"], json!(0.95));
        assert!(!response.shadow_evaluated);
    }

    #[test]
    fn execute_rejects_input_missing_required_field() {
        let mut request = sample_request();
        request.input = json!({"industry": "Technology", "size": 150, "license_type": "Free Zone", "sector": "Private"});
        let err = executor().execute(request);
        assert!(matches!(err, Err(ExecutorError::Validation(_))));
    }

    #[test]
    fn unknown_tool_is_a_configuration_error() {
        let mut request = sample_request();
        request.tool_name = ToolName::new("not_a_real_tool").expect("tool name");
        let err = executor().execute(request);
        assert!(matches!(err, Err(ExecutorError::Configuration(_))));
    }

    /// Scenario: a government entity is discounted nearly to nothing by the
    /// `government_entity` edge case, regardless of its raw size and industry
    /// boosts.
    #[test]
    fn company_quality_discounts_a_government_entity() {
        let mut request = sample_request();
        request.input = json!({
            "name": "Dubai Municipality",
            "industry": "government",
            "size": 10_000,
            "license_type": "Mainland",
            "sector": "government"
        });
        let response = executor().execute(request).expect("execute");
        assert_eq!(response.result["quality_tier"], json!("TIER_3"));
        let score = response.result["score"].as_f64().expect("score is numeric");
        assert!(score <= 10.0, "expected a heavily discounted score, got {score}");
        assert!(response.outcome.edge_cases_applied.contains(&"government_entity".to_owned()));
    }

    /// Scenario: an HR Director's seniority and department are both inferred
    /// from the bare title, each carrying its own confidence penalty.
    #[test]
    fn contact_tier_infers_seniority_from_title() {
        let request = ExecuteRequest {
            tool_name: ToolName::new("contact_tier").expect("tool name"),
            input: json!({"title": "HR Director", "company_size": 250}),
            subject_key: SubjectKey::new("acme-co").expect("subject"),
            trace_id: TraceId::new("trace-2").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            decision_id: DecisionId::new("dec-2").expect("decision id"),
            experiment: None,
        };
        let response = executor_for(contact_tier_document()).execute(request).expect("execute");
        assert_eq!(response.result["tier"], json!("STRATEGIC"));
        assert_eq!(response.result["priority"], json!(1));
        let target_titles = response.result["target_titles"].as_array().expect("target_titles is an array");
        assert!(target_titles.contains(&json!("HR Director")));
        assert!(target_titles.contains(&json!("CHRO")));
        assert_eq!(response.result["confidence"], json!(0.9));
    }

    /// Scenario: a fresh hiring signal is scored hot and immediate.
    #[test]
    fn timing_score_treats_a_fresh_signal_as_hot() {
        let request = ExecuteRequest {
            tool_name: ToolName::new("timing_score").expect("tool name"),
            input: json!({"signal_age_days": 5, "signals": ["new_hire", "job_posting"], "fiscal_context": "mid_year"}),
            subject_key: SubjectKey::new("acme-co").expect("subject"),
            trace_id: TraceId::new("trace-3").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            decision_id: DecisionId::new("dec-3").expect("decision id"),
            experiment: None,
        };
        let response = executor_for(timing_score_document()).execute(request).expect("execute");
        assert_eq!(response.result["priority"], json!("HOT"));
        assert_eq!(response.result["timing_score"], json!(90));
        assert_eq!(response.result["urgency"], json!("immediate"));
    }

    /// Scenario: a stale signal lands cold, but a fiscal year-end edge case
    /// still boosts its raw timing score upward without changing its label.
    #[test]
    fn timing_score_applies_the_fiscal_year_end_boost_to_a_stale_signal() {
        let request = ExecuteRequest {
            tool_name: ToolName::new("timing_score").expect("tool name"),
            input: json!({"signal_age_days": 95, "signals": ["new_hire"], "fiscal_context": "year_end"}),
            subject_key: SubjectKey::new("acme-co").expect("subject"),
            trace_id: TraceId::new("trace-4").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            decision_id: DecisionId::new("dec-4").expect("decision id"),
            experiment: None,
        };
        let response = executor_for(timing_score_document()).execute(request).expect("execute");
        assert_eq!(response.result["priority"], json!("COLD"));
        assert_eq!(response.result["timing_score"], json!(20));
        assert!(response.outcome.edge_cases_applied.contains(&"fiscal_year_end_boost".to_owned()));
    }

    /// An enterprise technology company matches the premium commercial
    /// banking bundle, with full confidence since neither optional input
    /// was left to its inferred default.
    #[test]
    fn banking_product_match_recommends_the_enterprise_bundle() {
        let request = ExecuteRequest {
            tool_name: ToolName::new("banking_product_match").expect("tool name"),
            input: json!({"company_size": 6_000, "industry": "Technology", "maturity": "growth", "hiring_velocity": "high"}),
            subject_key: SubjectKey::new("acme-co").expect("subject"),
            trace_id: TraceId::new("trace-5").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            decision_id: DecisionId::new("dec-5").expect("decision id"),
            experiment: None,
        };
        let response = executor_for(banking_product_match_document()).execute(request).expect("execute");
        let products = response.result["recommended_products"].as_array().expect("products array");
        assert!(products.contains(&json!("Treasury Management")));
        assert!(products.contains(&json!("Trade Finance")));
        assert_eq!(response.result["confidence"], json!(0.9));
    }

    /// A strong lead across every upstream tool rolls up into a HOT
    /// composite tier.
    #[test]
    fn composite_score_rolls_up_a_strong_lead_as_hot() {
        let request = ExecuteRequest {
            tool_name: ToolName::new("composite_score").expect("tool name"),
            input: json!({
                "company_quality_score": 90,
                "contact_priority": 1,
                "timing_score": 90,
                "banking_match_confidence": 0.9,
                "channel_confidence": 0.9,
                "context_confidence": 0.85
            }),
            subject_key: SubjectKey::new("acme-co").expect("subject"),
            trace_id: TraceId::new("trace-6").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            decision_id: DecisionId::new("dec-6").expect("decision id"),
            experiment: None,
        };
        let response = executor_for(composite_score_document()).execute(request).expect("execute");
        assert_eq!(response.result["lead_score_tier"], json!("HOT"));
        assert_eq!(response.result["q_score"], json!(92.5));
        assert_eq!(response.result["confidence"], json!(0.765));
    }

    /// A company quality score below the disqualification cutoff zeroes the
    /// composite score outright, regardless of its other inputs.
    #[test]
    fn composite_score_disqualifies_a_low_quality_company() {
        let request = ExecuteRequest {
            tool_name: ToolName::new("composite_score").expect("tool name"),
            input: json!({
                "company_quality_score": 4.25,
                "contact_priority": 1,
                "timing_score": 90,
                "banking_match_confidence": 0.9
            }),
            subject_key: SubjectKey::new("acme-co").expect("subject"),
            trace_id: TraceId::new("trace-7").expect("trace"),
            tenant_id: TenantId::new("tenant-1").expect("tenant"),
            decision_id: DecisionId::new("dec-7").expect("decision id"),
            experiment: None,
        };
        let response = executor_for(composite_score_document()).execute(request).expect("execute");
        assert_eq!(response.result["lead_score_tier"], json!("DISQUALIFIED"));
        assert_eq!(response.result["q_score"], json!(0.0));
        assert!(response.outcome.edge_cases_applied.contains(&"low_quality_disqualification".to_owned()));
    }

    #[test]
    fn variant_assignment_is_deterministic() {
        let experiment_id = ExperimentId::new("exp-1").expect("experiment id");
        let subject = SubjectKey::new("acme-co").expect("subject");
        let mut variants = BTreeMap::new();
        variants.insert("control".to_owned(), RuleVersion::new("v1").expect("version"));
        variants.insert("treatment".to_owned(), RuleVersion::new("v2").expect("version"));
        let first = assign_variant(&experiment_id, &subject, &variants);
        let second = assign_variant(&experiment_id, &subject, &variants);
        assert_eq!(first, second);
    }

    /// A/B bucketing must be stable for every subject across repeated calls,
    /// not just for one sample subject — checked over a spread of 100
    /// synthetic subject keys.
    #[test]
    fn variant_assignment_is_deterministic_across_many_subjects() {
        let experiment_id = ExperimentId::new("exp-1").expect("experiment id");
        let mut variants = BTreeMap::new();
        variants.insert("control".to_owned(), RuleVersion::new("v1").expect("version"));
        variants.insert("treatment".to_owned(), RuleVersion::new("v2").expect("version"));

        for index in 1..=100 {
            let subject = SubjectKey::new(format!("K{index}")).expect("subject");
            let first = assign_variant(&experiment_id, &subject, &variants);
            let second = assign_variant(&experiment_id, &subject, &variants);
            assert_eq!(first, second, "subject K{index} must bucket consistently");
        }
    }
}
