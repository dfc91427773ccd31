//! # Feedback Library
//!
//! Core logic for turning a class roster into personalised feedback emails.
//! It loads a roster of student marks, computes class-wide statistics, asks a
//! text-generation service for one message per student, delivers and records
//! each message, and exports a summary spreadsheet for the teacher.
//!
//! ## Key Concepts
//! - **Roster**: the [`StudentRecord`]s parsed from one uploaded CSV/Excel file ([`loader`]).
//! - **Class statistics**: per-subject average and maximum, computed once per batch ([`stats`]).
//! - **Collaborators**: pluggable [`TextGenerator`], [`Mailer`] and [`FeedbackStore`] implementations ([`traits`]).
//! - **Batch**: one end-to-end run over a roster, driven by [`BatchRunner`] ([`batch`]).
//! - **Report**: the `.xlsx` summary of every student whose feedback was generated ([`report`]).

pub mod batch;
pub mod error;
pub mod gemini;
pub mod loader;
pub mod mailer;
pub mod prompt;
pub mod report;
pub mod stats;
pub mod store;
pub mod testing;
pub mod traits;
pub mod types;

pub use batch::{
    BatchGate, BatchOptions, BatchRequest, BatchRunner, BatchStatus, BatchSummary, Delivery,
    FailureReason, Persisted, ProcessedStudent, StudentFailure, StudentOutcome,
};
pub use error::{DispatchError, ExportError, FeedbackError, GenerationError, PersistenceError};
pub use prompt::PromptContext;
pub use traits::{feedback_store::FeedbackStore, mailer::Mailer, text_generator::TextGenerator};
pub use types::{ClassStats, FeedbackRecord, StudentRecord, Subject, SubjectScores, SubjectStats};
