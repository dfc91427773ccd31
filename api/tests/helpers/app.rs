use api::routes::routes;
use api::state::{AppState, batch_options};
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header::CONTENT_TYPE},
};
use db::test_utils::setup_test_db;
use feedback::BatchRunner;
use feedback::testing::{RecordingMailer, ScriptedGenerator};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use util::test_helpers::{setup_test_storage_root, test_config};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub generator: Arc<ScriptedGenerator>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: TempDir,
}

#[derive(Default)]
pub struct TestAppOptions {
    pub generator: ScriptedGenerator,
    pub mailer: RecordingMailer,
    pub max_upload_bytes: Option<usize>,
}

pub async fn make_test_app() -> TestApp {
    make_test_app_with(TestAppOptions::default()).await
}

/// Full `/api` router over an in-memory store, a temp storage root and fake
/// generator/mailer collaborators.
pub async fn make_test_app_with(options: TestAppOptions) -> TestApp {
    let storage = setup_test_storage_root();
    let mut config = test_config(&storage);
    if let Some(limit) = options.max_upload_bytes {
        config.max_upload_bytes = limit;
    }

    let db = setup_test_db().await;
    let generator = Arc::new(options.generator);
    let mailer = Arc::new(options.mailer);

    let runner = BatchRunner::new(
        generator.clone(),
        mailer.clone(),
        Arc::new(db.clone()),
        batch_options(&config),
    );
    let state = AppState::new(config, db, runner);
    let app = Router::new().nest("/api", routes(state.clone()));

    TestApp {
        app,
        state,
        generator,
        mailer,
        storage,
    }
}

pub const ROSTER_CSV: &str = "Name,Email,Physics,Chemistry,Maths,CS,English\n\
Asha Rao,asha@example.com,90,88,95,86,90\n\
Ben Li,ben@example.com,40,88,95,86,90\n";

const BOUNDARY: &str = "----BoundaryTest";

/// Hand-built multipart body with text fields and an optional `csv_file` part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((filename, content)) = file {
        body.extend(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"csv_file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend(content);
        body.extend(b"\r\n");
    }
    body.extend(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn default_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("teacher_name", "Ms Kapoor"),
        ("school_name", "Hillview High"),
        ("class_name", "12-B"),
        ("max_marks", "100"),
    ]
}

pub fn generate_request(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/feedback/generate")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(fields, file)))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
