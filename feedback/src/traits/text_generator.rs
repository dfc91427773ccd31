//! # Text Generator Trait
//!
//! The generation service is an opaque function from prompt to text. Anything
//! that can answer a prompt (a hosted LLM, a canned responder in tests) plugs in
//! here.

use crate::error::GenerationError;
use async_trait::async_trait;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produces text for `prompt`, or fails for this one request.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
