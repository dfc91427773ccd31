use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use util::paths::is_safe_filename;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// GET /api/download/{filename}
///
/// Download a generated summary spreadsheet. Nothing is generated here; the
/// file must have been produced by an earlier batch.
///
/// ### Path Parameters
/// - `filename`: e.g. `feedback_summary_Ms_Kapoor.xlsx`
///
/// ### Responses
///
/// - `200 OK`: the spreadsheet as an attachment
/// - `400 Bad Request`
/// ```json
/// { "success": false, "message": "Invalid filename" }
/// ```
/// - `404 Not Found`
/// ```json
/// { "success": false, "message": "File not found" }
/// ```
/// - `500 Internal Server Error`
/// ```json
/// { "success": false, "message": "Failed to read file" }
/// ```
pub async fn download_report(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error("Invalid filename")),
        )
            .into_response();
    }

    let fs_path = app_state.downloads_dir().join(&filename);

    if tokio::fs::metadata(&fs_path).await.is_err() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error("File not found")),
        )
            .into_response();
    }

    let buffer = match tokio::fs::read(&fs_path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(path = %fs_path.display(), error = %err, "File read error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error("Failed to read file")),
            )
                .into_response();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE));

    (StatusCode::OK, headers, buffer).into_response()
}
