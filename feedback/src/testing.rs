//! In-memory collaborators for tests.
//!
//! Used by this crate's unit tests and by the `api` integration tests, so they
//! live outside `#[cfg(test)]`.

use crate::error::{DispatchError, GenerationError, PersistenceError};
use crate::traits::{feedback_store::FeedbackStore, mailer::Mailer, text_generator::TextGenerator};
use crate::types::FeedbackRecord;
use async_trait::async_trait;
use sea_orm::DbErr;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Answers every prompt with a canned message, except prompts containing one
/// of the configured needles, which fail.
#[derive(Default)]
pub struct ScriptedGenerator {
    fail_when_contains: Vec<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any prompt that contains `needle` (e.g. a student name).
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_when_contains.push(needle.into());
        self
    }

    /// Sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_when_contains.iter().any(|n| prompt.contains(n)) {
            return Err(GenerationError::Status {
                status: 503,
                body: "scripted failure".into(),
            });
        }

        let name = prompt
            .lines()
            .find_map(|l| l.strip_prefix("- Name: "))
            .unwrap_or("student");
        Ok(format!("Dear {name}, keep up the good work."))
    }
}

/// One recorded delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records deliveries; fails for chosen recipients.
#[derive(Default)]
pub struct RecordingMailer {
    reject: HashSet<String>,
    delay: Option<Duration>,
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, email: impl Into<String>) -> Self {
        self.reject.insert(email.into());
        self
    }

    /// Sleeps before every send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject.contains(to) {
            return Err(DispatchError::Transport(format!("mailbox {to} unavailable")));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMail {
                to: to.into(),
                subject: subject.into(),
                body: body.into(),
            });
        }
        Ok(())
    }
}

/// Vec-backed store; can refuse appends for chosen emails or refuse `init`.
#[derive(Default)]
pub struct MemoryStore {
    reject: HashSet<String>,
    broken: bool,
    rows: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, email: impl Into<String>) -> Self {
        self.reject.insert(email.into());
        self
    }

    /// Every call fails, including `init`.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<FeedbackRecord> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn init(&self) -> Result<(), PersistenceError> {
        if self.broken {
            return Err(DbErr::Custom("store offline".into()).into());
        }
        Ok(())
    }

    async fn append(&self, record: &FeedbackRecord) -> Result<i64, PersistenceError> {
        if self.broken || self.reject.contains(&record.email) {
            return Err(DbErr::Custom(format!("cannot store {}", record.email)).into());
        }
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| PersistenceError::Database(DbErr::Custom("poisoned".into())))?;
        rows.push(record.clone());
        Ok(rows.len() as i64)
    }
}
