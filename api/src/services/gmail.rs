//! Gmail REST API transport.
//!
//! The message is built with lettre, base64url-encoded, and posted to
//! `users/me/messages/send` with a bearer token from a [`CredentialProvider`].
//! Without a configured sender, the authorized account's address is read once
//! from `users/me/profile`.

use crate::services::credentials::CredentialProvider;
use crate::services::email::{build_message, sender_mailbox};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use feedback::{DispatchError, Mailer};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

#[derive(Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

pub struct GmailApiMailer {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    from: OnceCell<Mailbox>,
    from_name: String,
    base_url: String,
}

impl GmailApiMailer {
    /// `from: None` sends as the account the credentials belong to.
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        from: Option<Mailbox>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
            from: OnceCell::new_with(from),
            from_name: String::new(),
            base_url: GMAIL_API_BASE.to_string(),
        })
    }

    /// Display name used with the profile address.
    pub fn with_from_name(mut self, from_name: impl Into<String>) -> Self {
        self.from_name = from_name.into();
        self
    }

    /// Points the mailer at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/gmail/v1/users/me/messages/send", self.base_url)
    }

    async fn sender(&self, token: &str) -> Result<&Mailbox, DispatchError> {
        self.from
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(format!("{}/gmail/v1/users/me/profile", self.base_url))
                    .bearer_auth(token)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| DispatchError::Transport(e.to_string()))?;
                let profile: Profile = response
                    .json()
                    .await
                    .map_err(|e| DispatchError::Transport(e.to_string()))?;

                tracing::info!(from = %profile.email_address, "Resolved Gmail sender");
                sender_mailbox(&profile.email_address, &self.from_name)
            })
            .await
    }
}

#[async_trait]
impl Mailer for GmailApiMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        let token = self
            .credentials
            .access_token()
            .await
            .map_err(|e| DispatchError::Credential(e.to_string()))?;

        let message = build_message(self.sender(&token).await?, to, subject, body)?;
        let raw = URL_SAFE.encode(message.formatted());

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&SendRequest { raw })
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Transport(format!(
                "Gmail API returned HTTP {status}: {body}"
            )));
        }
        Ok(())
    }
}
