//! SQLite-backed [`FeedbackStore`] on a sea-orm connection.

use crate::error::PersistenceError;
use crate::traits::feedback_store::FeedbackStore;
use crate::types::FeedbackRecord;
use async_trait::async_trait;
use db::models::feedback::{Model as FeedbackModel, NewFeedback};
use sea_orm::DatabaseConnection;

impl From<&FeedbackRecord> for NewFeedback {
    fn from(record: &FeedbackRecord) -> Self {
        let s = record.scores;
        NewFeedback {
            name: record.student_name.clone(),
            email: record.email.clone(),
            physics: s.physics,
            chemistry: s.chemistry,
            maths: s.maths,
            cs: s.cs,
            english: s.english,
            feedback: record.feedback_text.clone(),
        }
    }
}

#[async_trait]
impl FeedbackStore for DatabaseConnection {
    async fn init(&self) -> Result<(), PersistenceError> {
        db::init_schema(self).await?;
        Ok(())
    }

    async fn append(&self, record: &FeedbackRecord) -> Result<i64, PersistenceError> {
        let saved = FeedbackModel::create(self, NewFeedback::from(record)).await?;
        Ok(saved.id)
    }
}
