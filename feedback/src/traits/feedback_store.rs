//! # Feedback Store Trait
//!
//! Append-only persistence for generated feedback.

use crate::error::PersistenceError;
use crate::types::FeedbackRecord;
use async_trait::async_trait;

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Creates the schema if needed. Idempotent; called at the start of every batch.
    async fn init(&self) -> Result<(), PersistenceError>;

    /// Appends one record and returns its generated id.
    async fn append(&self, record: &FeedbackRecord) -> Result<i64, PersistenceError>;
}
