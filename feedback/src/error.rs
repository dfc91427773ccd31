//! Feedback Error Types
//!
//! Errors are split by blast radius. [`FeedbackError`] rejects a whole request
//! before any student is processed. [`GenerationError`], [`DispatchError`] and
//! [`PersistenceError`] describe what went wrong for a single student; the batch
//! records them and moves on to the next student.

use sea_orm::DbErr;

/// Request-level failures. Nothing is generated, sent, stored or exported.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed roster: {0}")]
    MalformedInput(String),

    #[error("Roster contains no students")]
    EmptyRoster,

    #[error("Feedback store unavailable: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Failed to write summary report: {0}")]
    Export(#[from] ExportError),
}

impl FeedbackError {
    /// True for problems with the uploaded roster itself (HTTP 400 territory).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FeedbackError::UnsupportedFormat(_)
                | FeedbackError::MalformedInput(_)
                | FeedbackError::EmptyRoster
        )
    }
}

/// The text-generation collaborator could not produce feedback for one student.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service is not configured: {0}")]
    NotConfigured(String),

    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode generation response: {0}")]
    Decode(String),

    #[error("generation service returned no text")]
    Empty,

    #[error("generation timed out after {0}s")]
    Timeout(u64),
}

/// Delivery of one feedback email failed. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid recipient address '{0}'")]
    InvalidAddress(String),

    #[error("could not build message: {0}")]
    Message(String),

    #[error("mail credential unavailable: {0}")]
    Credential(String),

    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("mail delivery timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
