//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → Health check endpoint
//! - `/feedback` → Run a feedback batch from an uploaded roster, poll batch status
//! - `/feedbacks` → Stored feedback rows (audit)
//! - `/download` → Generated summary spreadsheets

use crate::routes::{
    download::download_routes, feedback::feedback_routes, feedback::get::list_feedbacks,
    health::health_routes,
};
use crate::state::AppState;
use axum::{Router, routing::get};

pub mod common;
pub mod download;
pub mod feedback;
pub mod health;

/// Builds the complete `/api` router with its state attached.
///
/// # Route Structure:
/// - `GET  /health`
/// - `POST /feedback/generate`
/// - `GET  /feedback/status`
/// - `GET  /feedbacks?email=`
/// - `GET  /download/{filename}`
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/feedback", feedback_routes(&app_state))
        .route("/feedbacks", get(list_feedbacks))
        .nest("/download", download_routes())
        .with_state(app_state)
}
