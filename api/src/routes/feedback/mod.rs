//! Feedback Routes Module
//!
//! Runs feedback batches from uploaded rosters and exposes batch status and the
//! stored feedback audit trail.

use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use get::batch_status;
use post::generate_feedback;

pub mod get;
pub mod post;

/// Registers the routes for feedback endpoints.
///
/// - `POST /generate`: Upload a roster and run a batch. The body limit comes from `MAX_UPLOAD_BYTES`.
/// - `GET /status`: Whether a batch is currently running.
pub fn feedback_routes(app_state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/generate",
            post(generate_feedback)
                .layer(DefaultBodyLimit::max(app_state.config().max_upload_bytes)),
        )
        .route("/status", get(batch_status))
}
