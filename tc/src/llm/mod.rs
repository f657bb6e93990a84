//! LLM client module
//!
//! Provides the single narrow seam (`LlmClient`) between the pipeline and
//! the hosted model, an Anthropic implementation, and the `none` provider
//! used for offline/deterministic operation.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod gate;
mod types;

pub use anthropic::AnthropicClient;
pub use client::{LlmClient, NullLlmClient};
pub use error::LlmError;
pub use gate::LlmGate;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage, ToolCall, ToolDefinition};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Supports "anthropic" and "none" (every call fails fast and the pipeline
/// runs on its fallback heuristics).
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicClient::from_config(config)?)),
        "none" => Ok(Arc::new(NullLlmClient)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: anthropic, none",
            other
        ))),
    }
}
