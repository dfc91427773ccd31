//! Application configuration.
//!
//! `AppConfig` holds every runtime setting loaded from environment variables
//! (and an optional `.env` file). It is built once at startup and handed to the
//! application state explicitly; nothing in the workspace reads configuration
//! through a global.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Which transport delivers feedback emails when mail is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// Authenticated SMTP relay (Gmail app password by default).
    Smtp,
    /// Gmail REST API using a refreshable OAuth credential.
    GmailApi,
}

impl FromStr for MailTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smtp" => Ok(MailTransport::Smtp),
            "gmail_api" | "gmail-api" | "gmail" => Ok(MailTransport::GmailApi),
            other => Err(format!("unknown mail transport '{other}'")),
        }
    }
}

impl Display for MailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailTransport::Smtp => write!(f, "smtp"),
            MailTransport::GmailApi => write!(f, "gmail_api"),
        }
    }
}

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub storage_root: String,
    pub host: String,
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_timeout_secs: u64,
    pub disable_email: bool,
    pub mail_transport: MailTransport,
    pub gmail_username: String,
    pub gmail_app_password: String,
    pub email_from_name: String,
    pub gmail_token_path: String,
    pub mail_timeout_secs: u64,
    pub max_concurrent_students: usize,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".into(),
            project_name: "class-feedback".into(),
            log_level: "api=info,feedback=info".into(),
            log_file: "api.log".into(),
            log_to_stdout: false,
            database_path: "data/feedback.db".into(),
            storage_root: "storage".into(),
            host: "0.0.0.0".into(),
            port: 5000,
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".into(),
            gemini_base_url: "https://generativelanguage.googleapis.com".into(),
            generation_timeout_secs: 60,
            disable_email: false,
            mail_transport: MailTransport::Smtp,
            gmail_username: String::new(),
            gmail_app_password: String::new(),
            email_from_name: "Class Teacher".into(),
            gmail_token_path: "token.json".into(),
            mail_timeout_secs: 30,
            max_concurrent_students: 1,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `.env` and the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, falling back to
    /// [`AppConfig::default`] for unset keys.
    ///
    /// Numeric and boolean values that fail to parse are logged and replaced by
    /// their defaults rather than aborting startup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let flag = |key: &str, default: bool| match lookup(key) {
            Some(v) => v.trim().eq_ignore_ascii_case("true") || v.trim() == "1",
            None => default,
        };

        Self {
            env: string("APP_ENV", d.env),
            project_name: string("PROJECT_NAME", d.project_name),
            log_level: string("LOG_LEVEL", d.log_level),
            log_file: string("LOG_FILE", d.log_file),
            log_to_stdout: flag("LOG_TO_STDOUT", d.log_to_stdout),
            database_path: string("DATABASE_PATH", d.database_path),
            storage_root: string("STORAGE_ROOT", d.storage_root),
            host: string("HOST", d.host),
            port: parse_or(&lookup, "PORT", d.port),
            gemini_api_key: string("GEMINI_API_KEY", d.gemini_api_key),
            gemini_model: string("GEMINI_MODEL", d.gemini_model),
            gemini_base_url: string("GEMINI_BASE_URL", d.gemini_base_url),
            generation_timeout_secs: parse_or(
                &lookup,
                "GENERATION_TIMEOUT_SECS",
                d.generation_timeout_secs,
            ),
            disable_email: flag("DISABLE_EMAIL", d.disable_email),
            mail_transport: parse_or(&lookup, "MAIL_TRANSPORT", d.mail_transport),
            gmail_username: string("GMAIL_USERNAME", d.gmail_username),
            gmail_app_password: string("GMAIL_APP_PASSWORD", d.gmail_app_password),
            email_from_name: string("EMAIL_FROM_NAME", d.email_from_name),
            gmail_token_path: string("GMAIL_TOKEN_PATH", d.gmail_token_path),
            mail_timeout_secs: parse_or(&lookup, "MAIL_TIMEOUT_SECS", d.mail_timeout_secs),
            max_concurrent_students: parse_or(
                &lookup,
                "MAX_CONCURRENT_STUDENTS",
                d.max_concurrent_students,
            )
            .max(1),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", d.max_upload_bytes),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Ignoring invalid {key}={raw:?} ({e}); using {default}");
                default
            }
        },
        None => default,
    }
}
