// crates/scoring-api/src/handlers/feedback.rs
// ============================================================================
// Module: Feedback Handlers
// Description: POST /feedback, GET /feedback/summary, GET
//              /feedback/decisions/{decision_id}.
// Purpose: Close the loop between a logged decision and its caller-reported
//          outcome, and expose both aggregate and per-decision views of it.
// Dependencies: scoring-core, scoring-feedback, axum
// ============================================================================

//! ## Overview
//! `outcome_positive`/`outcome_type` on the wire map onto
//! [`FeedbackOutcome`]'s three-way `Accepted`/`Rejected`/`Overridden` split:
//! a positive outcome is `Accepted`; a negative outcome is `Rejected` unless
//! the caller names an override (`outcome_type == "overridden"`), in which
//! case it is `Overridden` regardless of `outcome_positive`.

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Response;
use scoring_core::DecisionId;
use scoring_core::FeedbackOutcome;
use scoring_core::FeedbackRecord;
use scoring_core::ToolName;
use scoring_core::time::Timestamp;
use scoring_feedback::AlertThresholds;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::ids;
use crate::state::AppState;

/// The `POST /feedback` request body.
#[derive(Debug, Deserialize)]
struct FeedbackBody {
    /// Decision this feedback closes the loop on.
    decision_id: String,
    /// Whether the recommendation led to the intended downstream action.
    outcome_positive: bool,
    /// Caller-declared outcome category; `"overridden"` takes the record to
    /// [`FeedbackOutcome::Overridden`] regardless of `outcome_positive`.
    #[serde(default)]
    outcome_type: Option<String>,
    /// Free-form structured detail, carried through unchanged.
    #[serde(default)]
    outcome_value: Value,
    /// Free-text notes, folded into the stored detail under `"notes"`.
    #[serde(default)]
    notes: Option<String>,
}

/// The `POST /feedback` response body.
#[derive(Debug, Serialize)]
struct FeedbackResponseBody {
    /// Identifier this feedback entry was logged under.
    feedback_id: String,
    /// The tool's updated performance summary after recording this entry.
    current_performance: scoring_core::PerformanceSummary,
}

/// Maps the wire's `outcome_positive`/`outcome_type` pair onto the ledger's
/// three-way [`FeedbackOutcome`].
fn resolve_outcome(positive: bool, outcome_type: Option<&str>) -> FeedbackOutcome {
    if outcome_type.is_some_and(|kind| kind.eq_ignore_ascii_case("overridden")) {
        return FeedbackOutcome::Overridden;
    }
    if positive { FeedbackOutcome::Accepted } else { FeedbackOutcome::Rejected }
}

/// Handles `POST /feedback`.
pub async fn record_feedback(State(state): State<AppState>, Json(body): Json<FeedbackBody>) -> Response {
    let trace_id = ids::new_trace_id();
    match run(&state, body).await {
        Ok(response) => (axum::http::StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response_with_trace(&trace_id),
    }
}

/// Looks up the referenced decision, appends the feedback record, and
/// returns the tool's refreshed performance summary.
async fn run(state: &AppState, body: FeedbackBody) -> Result<FeedbackResponseBody, ApiError> {
    let decision_id = DecisionId::new(body.decision_id).map_err(|err| ApiError::MalformedRequest(err.to_string()))?;
    let decision = state
        .ledger
        .get_decision(&decision_id)?
        .ok_or_else(|| ApiError::DecisionNotFound(decision_id.as_str().to_owned()))?;

    let mut detail = body.outcome_value;
    if let Some(notes) = body.notes {
        if let Value::Object(map) = &mut detail {
            map.insert("notes".to_owned(), Value::String(notes));
        } else {
            detail = serde_json::json!({ "notes": notes });
        }
    }

    let record = FeedbackRecord {
        feedback_id: ids::new_feedback_id(),
        decision_id,
        outcome: resolve_outcome(body.outcome_positive, body.outcome_type.as_deref()),
        detail,
        observed_at: state.clock.now_wall(),
    };
    let feedback_id = record.feedback_id.clone();
    state.ledger.append_feedback(record)?;

    let window_start = Timestamp::from_unix_millis(0);
    let current_performance = state.ledger.summarize_performance(&decision.tool_name, window_start)?;

    Ok(FeedbackResponseBody { feedback_id: feedback_id.into_inner(), current_performance })
}

/// Query parameters accepted by `GET /feedback/summary`.
#[derive(Debug, Deserialize)]
struct SummaryQuery {
    /// Tool the summary covers; required.
    tool: String,
    /// Window start, as Unix milliseconds; defaults to the epoch.
    #[serde(default)]
    from: Option<i64>,
    /// Window end, as Unix milliseconds; defaults to now.
    #[serde(default)]
    to: Option<i64>,
}

/// Handles `GET /feedback/summary`.
///
/// `version` and `group_by` query parameters named by the wire contract are
/// not yet supported: the ledger's read path summarizes one tool across its
/// full decision history, not split by rule version or grouped further.
pub async fn feedback_summary(State(state): State<AppState>, Query(query): Query<SummaryQuery>) -> Response {
    let trace_id = ids::new_trace_id();
    match summary(&state, query) {
        Ok(result) => (axum::http::StatusCode::OK, Json(result)).into_response(),
        Err(err) => err.into_response_with_trace(&trace_id),
    }
}

/// Runs an on-demand analysis window for `query.tool`.
fn summary(state: &AppState, query: SummaryQuery) -> Result<scoring_feedback::AnalysisResult, ApiError> {
    let tool_name = ToolName::new(query.tool).map_err(|err| ApiError::MalformedRequest(err.to_string()))?;
    let since = query.from.map_or(Timestamp::from_unix_millis(0), Timestamp::from_unix_millis);
    let now = query.to.map_or_else(|| state.clock.now_wall(), Timestamp::from_unix_millis);
    state.analyzer.analyze(&tool_name, since, now, &AlertThresholds::default()).map_err(ApiError::from)
}

/// One feedback entry as rendered in the decision detail response.
#[derive(Debug, Serialize)]
struct DecisionFeedbackView {
    /// Identifier of this feedback entry.
    feedback_id: String,
    /// Caller-reported outcome.
    outcome: FeedbackOutcome,
    /// Free-form structured detail.
    detail: Value,
    /// Wall-clock time the feedback was recorded.
    observed_at: String,
}

/// The `GET /feedback/decisions/{decision_id}` response body.
#[derive(Debug, Serialize)]
struct DecisionDetailBody {
    /// The decision record itself.
    decision: scoring_core::DecisionRecord,
    /// Every feedback entry recorded against it, oldest first.
    feedback: Vec<DecisionFeedbackView>,
}

/// Handles `GET /feedback/decisions/{decision_id}`.
pub async fn decision_detail(State(state): State<AppState>, Path(decision_id): Path<String>) -> Response {
    let trace_id = ids::new_trace_id();
    match detail(&state, decision_id) {
        Ok(body) => (axum::http::StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response_with_trace(&trace_id),
    }
}

/// Loads the decision and every feedback entry recorded against it.
fn detail(state: &AppState, decision_id: String) -> Result<DecisionDetailBody, ApiError> {
    let decision_id = DecisionId::new(decision_id).map_err(|err| ApiError::MalformedRequest(err.to_string()))?;
    let decision = state
        .ledger
        .get_decision(&decision_id)?
        .ok_or_else(|| ApiError::DecisionNotFound(decision_id.as_str().to_owned()))?;
    let feedback = state
        .ledger
        .feedback_for_decision(&decision_id)?
        .into_iter()
        .map(|record| {
            let observed_at = record.observed_at.to_rfc3339().unwrap_or_else(|_| record.observed_at.as_unix_millis().to_string());
            DecisionFeedbackView { feedback_id: record.feedback_id.into_inner(), outcome: record.outcome, detail: record.detail, observed_at }
        })
        .collect();
    Ok(DecisionDetailBody { decision, feedback })
}
