//! # Feedback Batch
//!
//! One batch turns an uploaded roster into feedback for every student:
//!
//! 1. load and validate the roster,
//! 2. compute class statistics once,
//! 3. prepare the store,
//! 4. for each student generate, mail and store the feedback,
//! 5. export the summary spreadsheet.
//!
//! Steps 1-3 and 5 fail the whole request. Anything that goes wrong in step 4
//! only affects that student and is reported in the [`BatchSummary`].
//!
//! Batches are serialized through a [`BatchGate`]: a second upload waits until
//! the current one has finished.

use crate::error::{DispatchError, FeedbackError, GenerationError};
use crate::loader::load_roster;
use crate::mailer::FEEDBACK_SUBJECT;
use crate::prompt::{PromptContext, build_prompt};
use crate::report::export_report;
use crate::stats::compute_subject_stats;
use crate::traits::{feedback_store::FeedbackStore, mailer::Mailer, text_generator::TextGenerator};
use crate::types::{ClassStats, FeedbackRecord, StudentRecord};
use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;

/// Everything one upload provides.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub context: PromptContext,
    /// Original upload name; its extension selects the parser.
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Where summary spreadsheets are written.
    pub downloads_dir: PathBuf,
    pub generation_timeout: Duration,
    pub mail_timeout: Duration,
    /// Students in flight at once. `1` processes strictly one at a time.
    pub max_concurrent: usize,
}

impl BatchOptions {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            generation_timeout: Duration::from_secs(60),
            mail_timeout: Duration::from_secs(30),
            max_concurrent: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Idle,
    Processing,
}

/// `Idle -> Processing -> Idle`. At most one batch holds the gate.
#[derive(Debug, Default)]
pub struct BatchGate {
    lock: Mutex<()>,
    processing: AtomicBool,
}

/// Held for the duration of a batch; returns the gate to idle on drop.
pub struct BatchGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    processing: &'a AtomicBool,
}

impl BatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for any running batch to finish, then marks the gate as processing.
    pub async fn acquire(&self) -> BatchGuard<'_> {
        let lock = self.lock.lock().await;
        self.processing.store(true, Ordering::SeqCst);
        BatchGuard {
            _lock: lock,
            processing: &self.processing,
        }
    }

    pub fn status(&self) -> BatchStatus {
        if self.processing.load(Ordering::SeqCst) {
            BatchStatus::Processing
        } else {
            BatchStatus::Idle
        }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.processing.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Mail is disabled; nothing left the process.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted {
    Stored(i64),
    Failed(String),
}

/// Why a student got no feedback at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    Generation(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Generation(msg) => write!(f, "feedback generation failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedStudent {
    pub record: FeedbackRecord,
    pub delivery: Delivery,
    pub persisted: Persisted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentFailure {
    pub name: String,
    pub email: String,
    pub reason: FailureReason,
}

pub type StudentOutcome = Result<ProcessedStudent, StudentFailure>;

/// Result of a completed batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub filename: String,
    pub path: PathBuf,
    /// Students whose feedback was generated (one report row each).
    pub processed: usize,
    pub emails_sent: usize,
    pub emails_skipped: usize,
    pub failed: Vec<StudentFailure>,
    pub delivery_failures: usize,
    pub persistence_failures: usize,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.delivery_failures == 0 && self.persistence_failures == 0
    }

    pub fn status_message(&self) -> String {
        if self.is_clean() {
            return "Feedback emails sent and stored in DB.".to_string();
        }
        let total = self.processed + self.failed.len();
        format!(
            "Feedback generated for {} of {} students ({} generation failures, {} delivery failures, {} storage failures).",
            self.processed,
            total,
            self.failed.len(),
            self.delivery_failures,
            self.persistence_failures,
        )
    }
}

pub struct BatchRunner {
    generator: Arc<dyn TextGenerator>,
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn FeedbackStore>,
    options: BatchOptions,
    gate: BatchGate,
}

impl BatchRunner {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        mailer: Arc<dyn Mailer>,
        store: Arc<dyn FeedbackStore>,
        options: BatchOptions,
    ) -> Self {
        Self {
            generator,
            mailer,
            store,
            options,
            gate: BatchGate::new(),
        }
    }

    pub fn status(&self) -> BatchStatus {
        self.gate.status()
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Runs one batch end to end.
    ///
    /// # Errors
    /// Request-level [`FeedbackError`]s only. When one is returned before the
    /// per-student loop, nothing has been generated, sent, stored or exported.
    pub async fn run(&self, request: BatchRequest) -> Result<BatchSummary, FeedbackError> {
        let _guard = self.gate.acquire().await;
        let ctx = &request.context;

        let students = load_roster(&request.filename, &request.bytes)?;
        let stats = compute_subject_stats(&students)?;
        self.store.init().await?;

        tracing::info!(
            teacher = %ctx.teacher_name,
            class = %ctx.class_name,
            students = students.len(),
            "Starting feedback batch"
        );

        let pending: Vec<_> = students
            .iter()
            .map(|student| self.process_student(student, &stats, ctx))
            .collect();
        let outcomes: Vec<StudentOutcome> = stream::iter(pending)
            .buffered(self.options.max_concurrent.max(1))
            .collect()
            .await;

        self.finish(ctx, outcomes)
    }

    async fn process_student(
        &self,
        student: &StudentRecord,
        stats: &ClassStats,
        ctx: &PromptContext,
    ) -> StudentOutcome {
        let prompt = build_prompt(student, stats, ctx);

        let text = match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(student = %student.name, error = %e, "Skipping student");
                return Err(StudentFailure {
                    name: student.name.clone(),
                    email: student.email.clone(),
                    reason: FailureReason::Generation(e.to_string()),
                });
            }
        };

        let record = FeedbackRecord::new(student, text);
        let delivery = self.deliver(&record).await;

        let persisted = match self.store.append(&record).await {
            Ok(id) => Persisted::Stored(id),
            Err(e) => {
                tracing::warn!(student = %student.name, error = %e, "Failed to store feedback");
                Persisted::Failed(e.to_string())
            }
        };

        Ok(ProcessedStudent {
            record,
            delivery,
            persisted,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let limit = self.options.generation_timeout;
        match timeout(limit, self.generator.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(limit.as_secs())),
        }
    }

    async fn deliver(&self, record: &FeedbackRecord) -> Delivery {
        let limit = self.options.mail_timeout;
        let send = self
            .mailer
            .send(&record.email, FEEDBACK_SUBJECT, &record.feedback_text);

        let result = match timeout(limit, send).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(limit.as_secs())),
        };

        match result {
            Ok(()) if self.mailer.delivers() => {
                tracing::info!(to = %record.email, "Feedback email sent");
                Delivery::Sent
            }
            Ok(()) => Delivery::Skipped,
            Err(e) => {
                tracing::warn!(to = %record.email, error = %e, "Failed to send feedback email");
                Delivery::Failed(e.to_string())
            }
        }
    }

    fn finish(
        &self,
        ctx: &PromptContext,
        outcomes: Vec<StudentOutcome>,
    ) -> Result<BatchSummary, FeedbackError> {
        let mut rows = Vec::with_capacity(outcomes.len());
        let mut failed = Vec::new();
        let (mut sent, mut skipped, mut undelivered, mut unstored) = (0, 0, 0, 0);

        for outcome in outcomes {
            match outcome {
                Ok(done) => {
                    match done.delivery {
                        Delivery::Sent => sent += 1,
                        Delivery::Skipped => skipped += 1,
                        Delivery::Failed(_) => undelivered += 1,
                    }
                    if matches!(done.persisted, Persisted::Failed(_)) {
                        unstored += 1;
                    }
                    rows.push(done.record);
                }
                Err(failure) => failed.push(failure),
            }
        }

        let path = export_report(&self.options.downloads_dir, &ctx.teacher_name, &rows)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let summary = BatchSummary {
            filename,
            path,
            processed: rows.len(),
            emails_sent: sent,
            emails_skipped: skipped,
            failed,
            delivery_failures: undelivered,
            persistence_failures: unstored,
        };

        tracing::info!(
            processed = summary.processed,
            failed = summary.failed.len(),
            delivery_failures = summary.delivery_failures,
            persistence_failures = summary.persistence_failures,
            file = %summary.filename,
            "Feedback batch finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::DisabledMailer;
    use crate::testing::{MemoryStore, RecordingMailer, ScriptedGenerator};
    use crate::types::SubjectScores;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: &str = "Name,Email,Physics,Chemistry,Maths,CS,English\n";

    fn roster(rows: &[(&str, &str, [i64; 5])]) -> Vec<u8> {
        let mut out = HEADER.to_string();
        for (name, email, s) in rows {
            out.push_str(&format!(
                "{name},{email},{},{},{},{},{}\n",
                s[0], s[1], s[2], s[3], s[4]
            ));
        }
        out.into_bytes()
    }

    fn class() -> Vec<u8> {
        roster(&[
            ("Asha Rao", "asha@example.com", [90, 88, 95, 86, 90]),
            ("Ben Li", "ben@example.com", [40, 88, 95, 86, 90]),
            ("Chitra Nair", "chitra@example.com", [65, 70, 75, 80, 85]),
        ])
    }

    fn request(bytes: Vec<u8>) -> BatchRequest {
        BatchRequest {
            context: PromptContext {
                teacher_name: "Ms Kapoor".into(),
                school_name: "Hillview High".into(),
                class_name: "12-B".into(),
                max_marks: 100.0,
            },
            filename: "marks.csv".into(),
            bytes,
        }
    }

    struct Fixture {
        dir: TempDir,
        generator: Arc<ScriptedGenerator>,
        mailer: Arc<RecordingMailer>,
        store: Arc<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with(ScriptedGenerator::new(), RecordingMailer::new(), MemoryStore::new())
        }

        fn with(generator: ScriptedGenerator, mailer: RecordingMailer, store: MemoryStore) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                generator: Arc::new(generator),
                mailer: Arc::new(mailer),
                store: Arc::new(store),
            }
        }

        fn options(&self) -> BatchOptions {
            BatchOptions::new(self.dir.path().join("downloads"))
        }

        fn runner(&self) -> BatchRunner {
            self.runner_with(self.options())
        }

        fn runner_with(&self, options: BatchOptions) -> BatchRunner {
            BatchRunner::new(
                self.generator.clone(),
                self.mailer.clone(),
                self.store.clone(),
                options,
            )
        }
    }

    fn report_names(path: &Path) -> Vec<String> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        range
            .rows()
            .skip(1)
            .map(|r| match &r[0] {
                Data::String(s) => s.clone(),
                other => panic!("unexpected cell {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn every_prompt_sees_the_same_class_statistics() {
        let fx = Fixture::new();
        fx.runner().run(request(class())).await.unwrap();

        let prompts = fx.generator.prompts();
        assert_eq!(prompts.len(), 3);
        for prompt in &prompts {
            // Physics: (90 + 40 + 65) / 3 = 65, max 90.
            assert!(prompt.contains("(Class Avg: 65, Max: 90)"), "{prompt}");
            assert!(prompt.contains("(Class Avg: 88.33, Max: 95)"), "{prompt}");
        }
    }

    #[tokio::test]
    async fn clean_batch_mails_stores_and_reports_everyone() {
        let fx = Fixture::new();
        let summary = fx.runner().run(request(class())).await.unwrap();

        assert!(summary.is_clean());
        assert_eq!(summary.status_message(), "Feedback emails sent and stored in DB.");
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.emails_sent, 3);
        assert_eq!(summary.filename, "feedback_summary_Ms_Kapoor.xlsx");
        assert!(summary.path.exists());

        let sent = fx.mailer.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].to, "asha@example.com");
        assert_eq!(sent[0].subject, FEEDBACK_SUBJECT);
        assert_eq!(sent[0].body, "Dear Asha Rao, keep up the good work.");

        assert_eq!(fx.store.rows().len(), 3);
        assert_eq!(
            report_names(&summary.path),
            ["Asha Rao", "Ben Li", "Chitra Nair"]
        );
    }

    #[tokio::test]
    async fn generation_failure_skips_student_everywhere() {
        let fx = Fixture::with(
            ScriptedGenerator::new().failing_on("- Name: Ben Li"),
            RecordingMailer::new(),
            MemoryStore::new(),
        );
        let summary = fx.runner().run(request(class())).await.unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].email, "ben@example.com");
        assert!(matches!(summary.failed[0].reason, FailureReason::Generation(_)));
        assert!(!summary.is_clean());

        assert!(fx.mailer.sent().iter().all(|m| m.to != "ben@example.com"));
        assert!(fx.store.rows().iter().all(|r| r.email != "ben@example.com"));
        assert_eq!(report_names(&summary.path), ["Asha Rao", "Chitra Nair"]);
    }

    #[tokio::test]
    async fn delivery_failure_still_stores_and_reports() {
        let fx = Fixture::with(
            ScriptedGenerator::new(),
            RecordingMailer::new().rejecting("ben@example.com"),
            MemoryStore::new(),
        );
        let summary = fx.runner().run(request(class())).await.unwrap();

        assert_eq!(summary.delivery_failures, 1);
        assert_eq!(summary.emails_sent, 2);
        assert!(summary.failed.is_empty());
        assert!(fx.store.rows().iter().any(|r| r.email == "ben@example.com"));
        assert_eq!(
            report_names(&summary.path),
            ["Asha Rao", "Ben Li", "Chitra Nair"]
        );
        assert!(summary.status_message().contains("1 delivery failures"));
    }

    #[tokio::test]
    async fn storage_failure_keeps_report_row() {
        let fx = Fixture::with(
            ScriptedGenerator::new(),
            RecordingMailer::new(),
            MemoryStore::new().rejecting("ben@example.com"),
        );
        let summary = fx.runner().run(request(class())).await.unwrap();

        assert_eq!(summary.persistence_failures, 1);
        assert_eq!(fx.store.rows().len(), 2);
        assert_eq!(fx.mailer.sent().len(), 3);
        assert_eq!(summary.processed, 3);
        assert!(report_names(&summary.path).contains(&"Ben Li".to_string()));
    }

    #[tokio::test]
    async fn unsupported_upload_leaves_no_trace() {
        let fx = Fixture::new();
        let mut req = request(class());
        req.filename = "marks.txt".into();

        let err = fx.runner().run(req).await.unwrap_err();
        assert!(matches!(err, FeedbackError::UnsupportedFormat(_)));
        assert!(err.is_client_error());

        assert!(fx.generator.prompts().is_empty());
        assert!(fx.mailer.sent().is_empty());
        assert!(fx.store.rows().is_empty());
        assert!(!fx.dir.path().join("downloads").exists());
    }

    #[tokio::test]
    async fn header_only_roster_is_rejected() {
        let fx = Fixture::new();
        let err = fx
            .runner()
            .run(request(HEADER.as_bytes().to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::EmptyRoster));
        assert!(fx.generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_aborts_before_generation() {
        let fx = Fixture::with(
            ScriptedGenerator::new(),
            RecordingMailer::new(),
            MemoryStore::broken(),
        );
        let err = fx.runner().run(request(class())).await.unwrap_err();

        assert!(matches!(err, FeedbackError::Persistence(_)));
        assert!(!err.is_client_error());
        assert!(fx.generator.prompts().is_empty());
        assert!(!fx.dir.path().join("downloads").exists());
    }

    #[tokio::test]
    async fn rerun_overwrites_report_and_accumulates_rows() {
        let fx = Fixture::new();
        let runner = fx.runner();

        runner.run(request(class())).await.unwrap();
        let second = runner
            .run(request(roster(&[(
                "Dev Shah",
                "dev@example.com",
                [50, 60, 70, 80, 90],
            )])))
            .await
            .unwrap();

        assert_eq!(fx.store.rows().len(), 4);
        assert_eq!(report_names(&second.path), ["Dev Shah"]);
    }

    #[tokio::test]
    async fn concurrent_processing_keeps_roster_order() {
        let fx = Fixture::with(
            ScriptedGenerator::new().with_delay(Duration::from_millis(20)),
            RecordingMailer::new(),
            MemoryStore::new(),
        );
        let mut options = fx.options();
        options.max_concurrent = 3;

        let summary = fx.runner_with(options).run(request(class())).await.unwrap();
        assert_eq!(
            report_names(&summary.path),
            ["Asha Rao", "Ben Li", "Chitra Nair"]
        );
    }

    #[tokio::test]
    async fn slow_generation_times_out_per_student() {
        let fx = Fixture::with(
            ScriptedGenerator::new().with_delay(Duration::from_millis(500)),
            RecordingMailer::new(),
            MemoryStore::new(),
        );
        let mut options = fx.options();
        options.generation_timeout = Duration::from_millis(20);

        let summary = fx.runner_with(options).run(request(class())).await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed.len(), 3);
        assert!(summary.failed[0].reason.to_string().contains("timed out"));
        assert!(fx.store.rows().is_empty());
        assert!(report_names(&summary.path).is_empty());
    }

    #[tokio::test]
    async fn slow_mail_times_out_but_feedback_is_kept() {
        let fx = Fixture::with(
            ScriptedGenerator::new(),
            RecordingMailer::new().with_delay(Duration::from_millis(500)),
            MemoryStore::new(),
        );
        let mut options = fx.options();
        options.mail_timeout = Duration::from_millis(20);
        let runner = fx.runner_with(options);

        let asha = StudentRecord {
            name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            scores: SubjectScores::from_ordered([90, 88, 95, 86, 90]),
        };
        let record = FeedbackRecord::new(&asha, "Dear Asha");
        match runner.deliver(&record).await {
            Delivery::Failed(reason) => assert!(reason.contains("mail delivery timed out")),
            other => panic!("unexpected delivery: {other:?}"),
        }

        let summary = runner.run(request(class())).await.unwrap();
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.delivery_failures, 3);
        assert_eq!(summary.emails_sent, 0);
        assert_eq!(fx.store.rows().len(), 3);
        assert_eq!(report_names(&summary.path).len(), 3);
    }

    #[tokio::test]
    async fn disabled_mail_is_reported_as_skipped() {
        let fx = Fixture::new();
        let runner = BatchRunner::new(
            fx.generator.clone(),
            Arc::new(DisabledMailer),
            fx.store.clone(),
            fx.options(),
        );
        let summary = runner.run(request(class())).await.unwrap();

        assert_eq!(summary.emails_sent, 0);
        assert_eq!(summary.emails_skipped, 3);
        assert_eq!(fx.store.rows().len(), 3);
        assert!(summary.is_clean());
    }

    #[tokio::test]
    async fn gate_reports_processing_while_a_batch_runs() {
        let fx = Fixture::with(
            ScriptedGenerator::new().with_delay(Duration::from_millis(200)),
            RecordingMailer::new(),
            MemoryStore::new(),
        );
        let runner = Arc::new(fx.runner());
        assert_eq!(runner.status(), BatchStatus::Idle);

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run(request(class())).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runner.status(), BatchStatus::Processing);

        handle.await.unwrap().unwrap();
        assert_eq!(runner.status(), BatchStatus::Idle);
    }

    #[tokio::test]
    async fn second_batch_waits_for_the_first() {
        let gate = Arc::new(BatchGate::new());
        let first = gate.acquire().await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _guard = gate.acquire().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert_eq!(gate.status(), BatchStatus::Idle);
    }
}
