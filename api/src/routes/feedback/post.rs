use crate::response::ApiResponse;
use crate::routes::common::GenerateResponse;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use feedback::{BatchRequest, PromptContext};

/// Validated multipart form of a generate request.
#[derive(Debug)]
struct GenerateForm {
    teacher_name: String,
    school_name: String,
    class_name: String,
    max_marks: f64,
    filename: String,
    bytes: Vec<u8>,
}

impl GenerateForm {
    fn into_request(self) -> BatchRequest {
        BatchRequest {
            context: PromptContext {
                teacher_name: self.teacher_name,
                school_name: self.school_name,
                class_name: self.class_name,
                max_marks: self.max_marks,
            },
            filename: self.filename,
            bytes: self.bytes,
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<GenerateResponse>::error(message)),
    )
        .into_response()
}

fn required(value: Option<String>, field: &str) -> Result<String, (StatusCode, String)> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err((
            StatusCode::BAD_REQUEST,
            format!("Missing required field: {field}"),
        )),
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<GenerateForm, (StatusCode, String)> {
    let mut teacher_name = None;
    let mut school_name = None;
    let mut class_name = None;
    let mut max_marks = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err((e.status(), e.body_text())),
        };
        let name = field.name().unwrap_or("").to_string();

        let text_err = |e: axum::extract::multipart::MultipartError| (e.status(), e.body_text());
        match name.as_str() {
            "teacher_name" => teacher_name = Some(field.text().await.map_err(text_err)?),
            "school_name" => school_name = Some(field.text().await.map_err(text_err)?),
            "class_name" => class_name = Some(field.text().await.map_err(text_err)?),
            "max_marks" => max_marks = Some(field.text().await.map_err(text_err)?),
            "csv_file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(text_err)?.to_vec();
                file = Some((filename, bytes));
            }
            _ => continue,
        }
    }

    let teacher_name = required(teacher_name, "teacher_name")?;
    let school_name = required(school_name, "school_name")?;
    let class_name = required(class_name, "class_name")?;

    let raw_marks = required(max_marks, "max_marks")?;
    let max_marks = match raw_marks.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("max_marks must be a positive number, got '{raw_marks}'"),
            ));
        }
    };

    let (filename, bytes) = match file {
        Some((filename, bytes)) if !filename.is_empty() => (filename, bytes),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "Missing file upload: csv_file".to_string(),
            ));
        }
    };

    Ok(GenerateForm {
        teacher_name,
        school_name,
        class_name,
        max_marks,
        filename,
        bytes,
    })
}

/// POST /api/feedback/generate
///
/// Upload a class roster and run one feedback batch: every student gets a
/// generated feedback email, every generated message is stored, and a summary
/// spreadsheet is written for download.
///
/// ### Request Body (Multipart Form Data)
/// - `teacher_name` (string, required): Signs the emails and names the spreadsheet.
/// - `school_name` (string, required)
/// - `class_name` (string, required)
/// - `max_marks` (number, required): Maximum marks per subject, > 0.
/// - `csv_file` (file, required): `.csv`, `.xlsx` or `.xls` with columns
///   `Name, Email, Physics, Chemistry, Maths, CS, English`.
///
/// ### Responses
///
/// - `200 OK` (also when some students failed; see `failed` and the counters)
/// ```json
/// {
///   "success": true,
///   "message": "Feedback emails sent and stored in DB.",
///   "data": {
///     "download_link": "/api/download/feedback_summary_Ms_Kapoor.xlsx",
///     "filename": "feedback_summary_Ms_Kapoor.xlsx",
///     "processed": 30,
///     "emails_sent": 30,
///     "failed": [],
///     "delivery_failures": 0,
///     "persistence_failures": 0
///   }
/// }
/// ```
///
/// - `400 Bad Request`: missing or invalid form field, unsupported file type,
///   malformed roster, or a roster without students.
/// - `413 Payload Too Large`: upload exceeds `MAX_UPLOAD_BYTES`.
/// - `500 Internal Server Error`: the store or the spreadsheet could not be written.
pub async fn generate_feedback(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err((status, message)) => {
            tracing::info!(%status, %message, "Rejected feedback request");
            return error_response(status, message);
        }
    };

    match app_state.runner().run(form.into_request()).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                GenerateResponse::from(&summary),
                summary.status_message(),
            )),
        )
            .into_response(),
        Err(e) if e.is_client_error() => {
            tracing::info!(error = %e, "Rejected roster");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Feedback batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
