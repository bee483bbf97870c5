// crates/scoring-api/src/lib.rs
// ============================================================================
// Module: Scoring API Library
// Description: The HTTP layer: shared application state, handlers, router.
// Purpose: Expose the tool-call and feedback surface over HTTP.
// Dependencies: crate::{error, handlers, ids, routes, state}
// ============================================================================

//! ## Overview
//! This crate owns no domain logic of its own. Every handler is wire format
//! plus dispatch: decode the request, call into `scoring-tools`,
//! `scoring-core`, or `scoring-feedback`, and render the uniform response or
//! error envelope. [`crate::state::AppState`] is built once by
//! `scoring-cli`'s `serve` command and cloned per request;
//! [`crate::routes::build_router`] is the only place paths are wired to
//! handlers. This crate never reads configuration or constructs its own
//! backing services — it has no process entry point of its own.

#![deny(missing_docs)]

pub mod error;
pub mod handlers;
pub mod ids;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
