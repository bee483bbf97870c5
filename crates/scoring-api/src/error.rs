// crates/scoring-api/src/error.rs
// ============================================================================
// Module: API Error Envelope
// Description: Maps the engine's error taxonomy onto the HTTP error
//              envelope and status codes.
// Purpose: Give every failure path — tool call, feedback write, feedback
//          query — one uniform `{ok, code, message, violations, trace_id}`
//          response shape.
// Dependencies: scoring-core, axum, serde_json
// ============================================================================

//! ## Overview
//! [`ApiError`] wraps every error this crate's handlers can produce.
//! [`ApiError::into_response`] never panics and never loses the caller's
//! `trace_id` — a degraded path is always explicit in the body, never a
//! silently altered result, per the error-handling design's user-visible
//! contract.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use scoring_core::ErrorCode;
use scoring_core::ExecutorError;
use scoring_core::LedgerError;
use scoring_core::SchemaViolation;
use scoring_core::TraceId;
use scoring_feedback::AnalyzerError;
use scoring_tools::RegistryError;
use serde::Serialize;

/// Every failure an HTTP handler in this crate can produce.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The named tool is unknown or blocked by policy.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The seven-step call procedure failed.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// A ledger read or write failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// The request body was structurally invalid (not a schema violation,
    /// which [`ExecutorError::Validation`] already covers, but malformed
    /// JSON or a missing required field).
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// A referenced decision does not exist.
    #[error("decision '{0}' not found")]
    DecisionNotFound(String),
    /// The blocking task running the seven-step call procedure panicked or
    /// was cancelled before it could return.
    #[error("tool execution task failed: {0}")]
    TaskFailed(String),
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Ledger(err) => Self::Ledger(err),
        }
    }
}

/// The uniform error response body.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    /// Always `false`; present so a success and error body are
    /// distinguishable without inspecting the status code.
    ok: bool,
    /// Stable error code for caller-side dispatch.
    code: String,
    /// Human-readable description, safe to log or display.
    message: String,
    /// Field-level schema violations, present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<Vec<SchemaViolation>>,
    /// Trace identifier the caller can quote back for support.
    trace_id: String,
}

impl ApiError {
    /// Returns the HTTP status this error maps to.
    const fn status(&self) -> StatusCode {
        match self {
            Self::Registry(RegistryError::UnknownTool(_)) => StatusCode::NOT_FOUND,
            Self::Registry(RegistryError::BlockedByPolicy(_)) => StatusCode::FORBIDDEN,
            Self::Executor(ExecutorError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Executor(ExecutorError::Store(_)) => StatusCode::NOT_FOUND,
            Self::Executor(ExecutorError::Evaluation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Executor(ExecutorError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Executor(ExecutorError::Configuration(_)) => StatusCode::FORBIDDEN,
            Self::Ledger(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::DecisionNotFound(_) => StatusCode::NOT_FOUND,
            Self::TaskFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the stable `code` field for the error envelope.
    fn code(&self) -> &'static str {
        match self {
            Self::Registry(RegistryError::UnknownTool(_)) => "RULE_NOT_FOUND",
            Self::Registry(RegistryError::BlockedByPolicy(_)) => "POLICY_VIOLATION",
            Self::Executor(executor) => executor.error_code().as_code_str(),
            Self::Ledger(_) => "UPSTREAM_FAILURE",
            Self::MalformedRequest(_) => "SCHEMA_VALIDATION_ERROR",
            Self::DecisionNotFound(_) => "DECISION_NOT_FOUND",
            Self::TaskFailed(_) => "UPSTREAM_FAILURE",
        }
    }

    /// Returns the field-level violations carried by a validation failure.
    fn violations(&self) -> Option<Vec<SchemaViolation>> {
        match self {
            Self::Executor(ExecutorError::Validation(err)) => Some(err.violations.clone()),
            _ => None,
        }
    }

    /// Renders this error as the uniform HTTP envelope, tagging it with
    /// `trace_id` so the caller can quote it back for support.
    #[must_use]
    pub fn into_response_with_trace(self, trace_id: &TraceId) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            ok: false,
            code: self.code().to_owned(),
            message: self.to_string(),
            violations: self.violations(),
            trace_id: trace_id.as_str().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    /// Renders without a known `trace_id`; handlers that already generated
    /// one should prefer [`ApiError::into_response_with_trace`] instead.
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            ok: false,
            code: self.code().to_owned(),
            message: self.to_string(),
            violations: self.violations(),
            trace_id: String::new(),
        };
        (status, Json(body)).into_response()
    }
}

/// Extension trait rendering [`ErrorCode`] as the envelope's stable string,
/// matching `serde`'s `SCREAMING_SNAKE_CASE` rendering without requiring a
/// round trip through `serde_json`.
trait ErrorCodeExt {
    /// Returns the stable string for this code.
    fn as_code_str(self) -> &'static str;
}

impl ErrorCodeExt for ErrorCode {
    fn as_code_str(self) -> &'static str {
        match self {
            Self::SchemaValidationError => "SCHEMA_VALIDATION_ERROR",
            Self::RuleNotFound => "RULE_NOT_FOUND",
            Self::RuleInvalid => "RULE_INVALID",
            Self::EvaluationError => "EVALUATION_ERROR",
            Self::PolicyViolation => "POLICY_VIOLATION",
            Self::Timeout => "TIMEOUT",
            Self::UpstreamFailure => "UPSTREAM_FAILURE",
        }
    }
}
