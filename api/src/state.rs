use crate::services::email::build_mailer;
use feedback::gemini::GeminiGenerator;
use feedback::{BatchOptions, BatchRunner, DispatchError, GenerationError};
use sea_orm::{DatabaseConnection, DbErr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use util::config::AppConfig;
use util::paths::{downloads_dir, storage_root};

/// Shared handles for every request: configuration, the feedback store and the
/// batch runner (which owns the batch gate).
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    db: DatabaseConnection,
    runner: Arc<BatchRunner>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("database: {0}")]
    Database(#[from] DbErr),

    #[error("generator: {0}")]
    Generator(#[from] GenerationError),

    #[error("mailer: {0}")]
    Mailer(#[from] DispatchError),
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection, runner: BatchRunner) -> Self {
        Self {
            config: Arc::new(config),
            db,
            runner: Arc::new(runner),
        }
    }

    /// Connects the store, prepares its schema and wires the production
    /// collaborators (Gemini and the configured mail transport).
    pub async fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let db = db::connect(&config.database_path).await?;
        db::init_schema(&db).await?;

        let generator = GeminiGenerator::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            Duration::from_secs(config.generation_timeout_secs),
        )?;
        if config.gemini_api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY is not set; every student will fail generation");
        }
        let mailer = build_mailer(&config)?;

        let runner = BatchRunner::new(
            Arc::new(generator),
            mailer,
            Arc::new(db.clone()),
            batch_options(&config),
        );
        Ok(Self::new(config, db, runner))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn runner(&self) -> &BatchRunner {
        &self.runner
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.runner.options().downloads_dir.clone()
    }
}

/// Batch settings derived from configuration.
pub fn batch_options(config: &AppConfig) -> BatchOptions {
    BatchOptions {
        downloads_dir: downloads_dir(&storage_root(&config.storage_root)),
        generation_timeout: Duration::from_secs(config.generation_timeout_secs),
        mail_timeout: Duration::from_secs(config.mail_timeout_secs),
        max_concurrent: config.max_concurrent_students,
    }
}
