//! OAuth access tokens for the Gmail API transport.
//!
//! The credential lives in an authorized-user token file (`token.json`):
//!
//! ```json
//! {
//!   "token": "ya29...",
//!   "refresh_token": "1//0g...",
//!   "client_id": "....apps.googleusercontent.com",
//!   "client_secret": "...",
//!   "token_uri": "https://oauth2.googleapis.com/token",
//!   "expiry": "2025-10-19T12:00:00Z"
//! }
//! ```
//!
//! An expired or missing access token is refreshed with the refresh token and
//! written back to the file. Without a refresh token the provider fails; the
//! first-time consent flow is not handled here.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed early.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("cannot read token file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot write token file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("token file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no valid access token and no refresh token available; re-authorize the account")]
    MissingRefreshToken,

    #[error("token refresh failed: {0}")]
    Refresh(String),
}

/// Anything that can hand out a currently valid bearer token.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, CredentialError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields such as `scopes` are preserved when the file is rewritten.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl AuthorizedUser {
    /// A token with no recorded expiry is treated as valid.
    pub fn has_valid_token(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (Some(token), _) if token.is_empty() => false,
            (Some(_), Some(expiry)) => expiry - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > now,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Reads, refreshes and rewrites an authorized-user token file.
pub struct AuthorizedUserFileProvider {
    path: PathBuf,
    client: reqwest::Client,
    cached: Mutex<Option<AuthorizedUser>>,
}

impl AuthorizedUserFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            client: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    async fn load(&self) -> Result<AuthorizedUser, CredentialError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CredentialError::Read {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn store(&self, user: &AuthorizedUser) -> Result<(), CredentialError> {
        let json = serde_json::to_string_pretty(user)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| CredentialError::Write {
                path: self.path.display().to_string(),
                source,
            })
    }

    async fn refresh(&self, user: &mut AuthorizedUser) -> Result<(), CredentialError> {
        let refresh_token = user
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(CredentialError::MissingRefreshToken)?;

        tracing::info!(token_uri = %user.token_uri, "Refreshing Gmail access token");

        let response = self
            .client
            .post(&user.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::Refresh(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Refresh(format!("HTTP {status}: {body}")));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::Refresh(e.to_string()))?;

        user.token = Some(refreshed.access_token);
        user.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));
        if let Some(rotated) = refreshed.refresh_token {
            user.refresh_token = Some(rotated);
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for AuthorizedUserFileProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().await;

        let mut user = match cached.take() {
            Some(user) => user,
            None => self.load().await?,
        };

        if !user.has_valid_token(Utc::now()) {
            let refreshed = self.refresh(&mut user).await;
            if let Err(e) = refreshed {
                *cached = Some(user);
                return Err(e);
            }
            self.store(&user).await?;
        }

        let token = user.token.clone().unwrap_or_default();
        *cached = Some(user);
        Ok(token)
    }
}
