use crate::state::AppState;
use axum::{Router, routing::get};
use get::download_report;

pub mod get;

/// Registers `GET /{filename}` for generated summary spreadsheets.
pub fn download_routes() -> Router<AppState> {
    Router::new().route("/{filename}", get(download_report))
}
