// crates/scoring-api/src/handlers/tools.rs
// ============================================================================
// Module: Tool Call Handler
// Description: POST /tools/{tool_name}.
// Purpose: Turn a caller's JSON body into an ExecuteRequest, run it through
//          the Decision Executor, and render the result/error envelope.
// Dependencies: scoring-tools, scoring-core, axum
// ============================================================================

//! ## Overview
//! This handler owns none of the seven-step call procedure itself — that is
//! [`scoring_tools::DecisionExecutor::execute`]. Its job is wire format
//! only: build a [`ExecuteRequest`] from the caller's `{params, context,
//! tenant_id}` body, resolve an active A/B experiment for the tool from
//! server-declared configuration (never from the request body — experiments
//! are an operator concern, not a caller one), and render the
//! `{result, confidence, breakdown, rule_version, decision_id}` response.

use std::time::Duration;

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Response;
use scoring_core::ExecutorError;
use scoring_core::SubjectKey;
use scoring_core::TenantId;
use scoring_core::ToolName;
use scoring_tools::ExecuteRequest;
use scoring_tools::ExperimentRequest;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::ids;
use crate::state::AppState;

/// Request context accompanying a tool call's `params`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RequestContext {
    /// Stable identifier for the subject (company, contact) this call
    /// concerns, used for A/B bucketing when an experiment is active.
    subject_key: Option<String>,
}

/// The `POST /tools/{tool_name}` request body.
#[derive(Debug, Deserialize)]
struct ExecuteBody {
    /// Tool-specific input payload, validated against the tool's input
    /// schema.
    params: Value,
    /// Caller-supplied request context.
    #[serde(default)]
    context: RequestContext,
    /// Tenant this call is made on behalf of.
    tenant_id: String,
}

/// The `POST /tools/{tool_name}` success response body.
#[derive(Debug, Serialize)]
struct ExecuteResponseBody {
    /// Authoritative result returned to the caller.
    result: Value,
    /// Confidence this result was produced with, in `[floor, 1.0]`.
    confidence: f64,
    /// The most influential breakdown steps behind `result`.
    key_factors: Vec<scoring_core::BreakdownStep>,
    /// Full explanation trail for `result`.
    breakdown: Vec<scoring_core::BreakdownStep>,
    /// Rule version used to produce `result`.
    rule_version: String,
    /// Identifier this decision was logged under.
    decision_id: String,
}

/// Handles `POST /tools/{tool_name}`.
///
/// # Errors
///
/// Returns an [`ApiError`] rendered as the uniform error envelope for every
/// failure the Decision Executor or tool registry can raise.
pub async fn execute_tool(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    Json(body): Json<ExecuteBody>,
) -> Response {
    let trace_id = ids::new_trace_id();
    match run(&state, tool_name, body, &trace_id).await {
        Ok(response) => (axum::http::StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response_with_trace(&trace_id),
    }
}

/// Builds and runs the executor call, isolated from the handler's response
/// plumbing so every error path shares one `trace_id`.
async fn run(
    state: &AppState,
    tool_name: String,
    body: ExecuteBody,
    trace_id: &scoring_core::TraceId,
) -> Result<ExecuteResponseBody, ApiError> {
    let tool_name = ToolName::new(tool_name).map_err(|err| ApiError::MalformedRequest(err.to_string()))?;
    let tenant_id = TenantId::new(body.tenant_id).map_err(|err| ApiError::MalformedRequest(err.to_string()))?;
    let subject_key = match body.context.subject_key {
        Some(value) => SubjectKey::new(value).map_err(|err| ApiError::MalformedRequest(err.to_string()))?,
        None => SubjectKey::new(tenant_id.as_str()).map_err(|err| ApiError::MalformedRequest(err.to_string()))?,
    };
    let experiment = active_experiment(state, &tool_name);
    let decision_id = ids::new_decision_id();
    let deadline_ms = state.config.sla_class(&tool_name).deadline_ms();

    let request = ExecuteRequest {
        tool_name,
        input: body.params,
        subject_key,
        trace_id: trace_id.clone(),
        tenant_id,
        decision_id,
        experiment,
    };

    let response = run_with_deadline(state, request, deadline_ms).await?;

    Ok(ExecuteResponseBody {
        result: response.result,
        confidence: response.outcome.confidence,
        key_factors: response.outcome.key_factors,
        breakdown: response.outcome.breakdown,
        rule_version: response.outcome.rule_version.to_string(),
        decision_id: response.decision_id.into_inner(),
    })
}

/// Runs the Decision Executor on a blocking task, bounded by the tool's
/// declared SLA deadline.
///
/// [`scoring_tools::DecisionExecutor::execute`] is synchronous CPU-bound
/// work, so it is moved onto a blocking thread rather than run inline on
/// the async runtime; [`tokio::time::timeout`] wraps the join so a stuck
/// evaluation surfaces as [`ExecutorError::Timeout`] instead of hanging the
/// caller indefinitely.
async fn run_with_deadline(
    state: &AppState,
    request: ExecuteRequest,
    deadline_ms: u64,
) -> Result<scoring_tools::ExecuteResponse, ApiError> {
    let executor = std::sync::Arc::clone(&state.executor);
    let task = tokio::task::spawn_blocking(move || executor.execute(request));
    match tokio::time::timeout(Duration::from_millis(deadline_ms), task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join_err)) => Err(ApiError::TaskFailed(join_err.to_string())),
        Err(_) => Err(ApiError::Executor(ExecutorError::Timeout { deadline_ms })),
    }
}

/// Resolves the single server-declared experiment routing this tool's
/// traffic, when one is configured.
fn active_experiment(state: &AppState, tool_name: &ToolName) -> Option<ExperimentRequest> {
    state.config.experiments.iter().find(|(_, experiment)| &experiment.tool_name == tool_name).map(
        |(experiment_id, experiment)| ExperimentRequest {
            experiment_id: experiment_id.clone(),
            variants: experiment.variants.clone(),
        },
    )
}
