//! Email delivery for feedback messages.
//!
//! Feedback is sent as a plain-text email from the configured Gmail account,
//! either through the authenticated SMTP relay or through the Gmail REST API
//! (see [`crate::services::gmail`]). Both transports share [`build_message`].
//!
//! # Environment Variables
//! - `GMAIL_USERNAME`: Gmail address to send emails from (optional with `gmail_api`)
//! - `GMAIL_APP_PASSWORD`: Gmail app password for SMTP authentication
//! - `EMAIL_FROM_NAME`: Display name for the sender
//! - `MAIL_TRANSPORT`: `smtp` (default) or `gmail_api`
//! - `DISABLE_EMAIL`: when true, nothing is sent

use crate::services::credentials::AuthorizedUserFileProvider;
use crate::services::gmail::GmailApiMailer;
use async_trait::async_trait;
use feedback::mailer::DisabledMailer;
use feedback::{DispatchError, Mailer};
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::{AsyncSmtpTransport, authentication::Credentials};
use lettre::{AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use util::config::{AppConfig, MailTransport};

const SMTP_HOST: &str = "smtp.gmail.com";
const SMTP_PORT: u16 = 587;

/// Sender mailbox, `"<from_name> <username>"`.
pub fn sender_mailbox(username: &str, from_name: &str) -> Result<Mailbox, DispatchError> {
    if username.trim().is_empty() {
        return Err(DispatchError::Credential("GMAIL_USERNAME is not set".into()));
    }
    let raw = if from_name.trim().is_empty() {
        username.to_string()
    } else {
        format!("{from_name} <{username}>")
    };
    raw.parse()
        .map_err(|_| DispatchError::InvalidAddress(username.to_string()))
}

/// Builds a plain-text message. Fails on an unparsable recipient.
pub fn build_message(
    from: &Mailbox,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message, DispatchError> {
    let to: Mailbox = to
        .trim()
        .parse()
        .map_err(|_| DispatchError::InvalidAddress(to.to_string()))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| DispatchError::Message(e.to_string()))
}

/// Gmail SMTP relay with STARTTLS and app-password credentials.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(username: &str, password: &str, from_name: &str) -> Result<Self, DispatchError> {
        let from = sender_mailbox(username, from_name)?;
        if password.is_empty() {
            return Err(DispatchError::Credential("GMAIL_APP_PASSWORD is not set".into()));
        }

        let tls_parameters = TlsParameters::new(SMTP_HOST.to_string())
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(SMTP_HOST)
            .map_err(|e| DispatchError::Transport(e.to_string()))?
            .port(SMTP_PORT)
            .tls(Tls::Required(tls_parameters))
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        let message = build_message(&self.from, to, subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Picks the mail transport from configuration.
pub fn build_mailer(config: &AppConfig) -> Result<Arc<dyn Mailer>, DispatchError> {
    if config.disable_email {
        tracing::info!("Email delivery disabled");
        return Ok(Arc::new(DisabledMailer));
    }

    match config.mail_transport {
        MailTransport::Smtp => Ok(Arc::new(SmtpMailer::new(
            &config.gmail_username,
            &config.gmail_app_password,
            &config.email_from_name,
        )?)),
        MailTransport::GmailApi => {
            let from = if config.gmail_username.trim().is_empty() {
                None
            } else {
                Some(sender_mailbox(&config.gmail_username, &config.email_from_name)?)
            };
            let credentials = AuthorizedUserFileProvider::new(&config.gmail_token_path);
            let mailer = GmailApiMailer::new(
                Arc::new(credentials),
                from,
                Duration::from_secs(config.mail_timeout_secs),
            )?
            .with_from_name(&config.email_from_name);
            Ok(Arc::new(mailer))
        }
    }
}
