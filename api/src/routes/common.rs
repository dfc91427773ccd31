use feedback::{BatchSummary, StudentFailure};
use serde::{Deserialize, Serialize};

/// Path under which generated spreadsheets are served.
pub const DOWNLOAD_PREFIX: &str = "/api/download";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct FailedStudent {
    pub name: String,
    pub email: String,
    pub reason: String,
}

impl From<&StudentFailure> for FailedStudent {
    fn from(failure: &StudentFailure) -> Self {
        Self {
            name: failure.name.clone(),
            email: failure.email.clone(),
            reason: failure.reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GenerateResponse {
    pub download_link: String,
    pub filename: String,
    pub processed: usize,
    pub emails_sent: usize,
    pub emails_skipped: usize,
    pub failed: Vec<FailedStudent>,
    pub delivery_failures: usize,
    pub persistence_failures: usize,
}

impl From<&BatchSummary> for GenerateResponse {
    fn from(summary: &BatchSummary) -> Self {
        Self {
            download_link: format!("{DOWNLOAD_PREFIX}/{}", summary.filename),
            filename: summary.filename.clone(),
            processed: summary.processed,
            emails_sent: summary.emails_sent,
            emails_skipped: summary.emails_skipped,
            failed: summary.failed.iter().map(FailedStudent::from).collect(),
            delivery_failures: summary.delivery_failures,
            persistence_failures: summary.persistence_failures,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub physics: i64,
    pub chemistry: i64,
    pub maths: i64,
    pub cs: i64,
    pub english: i64,
    pub feedback: String,
}

impl From<db::models::feedback::Model> for FeedbackResponse {
    fn from(row: db::models::feedback::Model) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            physics: row.physics,
            chemistry: row.chemistry,
            maths: row.maths,
            cs: row.cs,
            english: row.english,
            feedback: row.feedback,
        }
    }
}
