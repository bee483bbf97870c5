// crates/scoring-api/src/handlers/health.rs
// ============================================================================
// Module: Health Handlers
// Description: GET /healthz, GET /readyz.
// Purpose: Distinguish "the process is up" from "the process can actually
//          serve every registered tool".
// Dependencies: scoring-tools, scoring-core, axum
// ============================================================================

//! ## Overview
//! [`RuleStore::readiness`] only confirms the backing rule source is
//! reachable; it does not confirm a production version is loaded for every
//! registered tool. `/readyz` checks that stronger condition itself by
//! resolving each catalog tool's production version in turn.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

use crate::state::AppState;

/// Handles `GET /healthz`: the process accepted the request at all.
pub async fn healthz() -> &'static str {
    "ok"
}

/// One tool's readiness outcome.
#[derive(Debug, Serialize)]
struct ToolReadiness {
    /// Tool this entry concerns.
    tool_name: String,
    /// Whether a production rule version resolved for it.
    ready: bool,
    /// Failure detail, present only when `ready` is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// The `GET /readyz` response body.
#[derive(Debug, Serialize)]
struct ReadinessBody {
    /// Whether every catalog tool resolved a production version.
    ready: bool,
    /// Per-tool breakdown.
    tools: Vec<ToolReadiness>,
}

/// Handles `GET /readyz`: every registered tool has a loaded production rule
/// version. Returns `503` when any tool is not ready.
pub async fn readyz(State(state): State<AppState>) -> Response {
    let tools: Vec<ToolReadiness> = state
        .registry
        .catalog_names()
        .into_iter()
        .map(|tool_name| match state.rule_store.production(&tool_name) {
            Ok(_) => ToolReadiness { tool_name: tool_name.into_inner(), ready: true, detail: None },
            Err(err) => ToolReadiness { tool_name: tool_name.into_inner(), ready: false, detail: Some(err.to_string()) },
        })
        .collect();
    let ready = tools.iter().all(|tool| tool.ready);
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(ReadinessBody { ready, tools })).into_response()
}
