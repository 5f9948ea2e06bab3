//! LLM Client module for Route Roulette
//!
//! Provides the client trait, the Gemini implementation and request types.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use types::{
    Citation, CompletionRequest, CompletionResponse, GroundingTool, Message, Role, StopReason, StreamChunk, TokenUsage,
};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Supports the "gemini" provider.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, "create_client: called");
    match config.provider.as_str() {
        "gemini" | "google" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::InvalidResponse(format!(
                "Unknown LLM provider: '{}'. Supported: gemini",
                other
            )))
        }
    }
}
