//! Mailer helpers shared by every transport.

use crate::error::DispatchError;
use crate::traits::mailer::Mailer;
use async_trait::async_trait;

/// Subject line of every feedback email.
pub const FEEDBACK_SUBJECT: &str = "Academic Performance Feedback";

/// Used when `DISABLE_EMAIL=true`: logs the intent and sends nothing.
#[derive(Debug, Default, Clone)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        tracing::info!(
            to,
            subject,
            body_chars = body.chars().count(),
            "Skipped sending email (DISABLE_EMAIL enabled)"
        );
        Ok(())
    }

    fn delivers(&self) -> bool {
        false
    }
}
