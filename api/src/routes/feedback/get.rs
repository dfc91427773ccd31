use crate::response::ApiResponse;
use crate::routes::common::FeedbackResponse;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use db::models::feedback::Model as FeedbackModel;
use feedback::BatchStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: BatchStatus,
}

/// GET /api/feedback/status
///
/// ### Response
/// ```json
/// { "success": true, "data": { "status": "idle" }, "message": "Batch status retrieved" }
/// ```
pub async fn batch_status(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(
        StatusResponse {
            status: app_state.runner().status(),
        },
        "Batch status retrieved",
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub email: Option<String>,
}

/// GET /api/feedbacks
///
/// Stored feedback rows, newest first.
///
/// ### Query Parameters
/// - `email` (optional): only rows sent to this address.
///
/// ### Responses
/// - `200 OK`: `data` is a list of rows (`id`, `name`, `email`, the five scores, `feedback`).
/// - `500 Internal Server Error`: database error.
pub async fn list_feedbacks(
    State(app_state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let db = app_state.db();
    let email = query.email.as_deref().map(str::trim).filter(|e| !e.is_empty());

    let rows = match email {
        Some(email) => FeedbackModel::find_by_email(db, email).await,
        None => FeedbackModel::find_all(db).await,
    };

    match rows {
        Ok(rows) => {
            let data: Vec<FeedbackResponse> = rows.into_iter().map(FeedbackResponse::from).collect();
            let message = format!("Retrieved {} feedback records", data.len());
            (StatusCode::OK, Json(ApiResponse::success(data, message)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load feedback records");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<FeedbackResponse>>::error("Database error")),
            )
        }
    }
}
