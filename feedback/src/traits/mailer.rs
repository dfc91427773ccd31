//! # Mailer Trait
//!
//! Delivery of one plain-text message to one recipient. Implementations own
//! their credentials; callers only see success or a [`DispatchError`].

use crate::error::DispatchError;
use async_trait::async_trait;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DispatchError>;

    /// `false` for transports that only log what they would have sent.
    fn delivers(&self) -> bool {
        true
    }
}
