// crates/scoring-api/src/routes.rs
// ============================================================================
// Module: Router Assembly
// Description: Wires every handler to its path.
// Purpose: Keep route wiring in one place, separate from handler logic and
//          from process bootstrap.
// Dependencies: axum, crate::handlers
// ============================================================================

use axum::Router;
use axum::routing::get;
use axum::routing::post;

use crate::handlers::feedback;
use crate::handlers::health;
use crate::handlers::tools;
use crate::state::AppState;

/// Builds the complete axum router over `state`.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/tools/{tool_name}", post(tools::execute_tool))
        .route("/feedback", post(feedback::record_feedback))
        .route("/feedback/summary", get(feedback::feedback_summary))
        .route("/feedback/decisions/{decision_id}", get(feedback::decision_detail))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .with_state(state)
}
