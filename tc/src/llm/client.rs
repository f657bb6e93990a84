//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// This is the single narrow seam between the pipeline and whatever model
/// backs it. Every completion request carries its full context; no
/// conversation state is kept between calls, so tests can substitute a
/// deterministic implementation and the pipeline stays a pure function of
/// its typed inputs.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Client that refuses every call
///
/// Selecting provider `none` (or `tc capture --offline`) wires this in, which
/// forces every stage onto its deterministic fallback path. The response is
/// degraded (lower confidence, more UNKNOWN steps) but always valid.
pub struct NullLlmClient;

#[async_trait]
impl LlmClient for NullLlmClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::Disabled)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    use crate::llm::{StopReason, TokenUsage, ToolCall};

    /// Mock LLM client for unit tests: pops scripted responses in order
    pub struct MockLlmClient {
        responses: Mutex<Vec<Result<CompletionResponse, LlmError>>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }

        /// Single response that calls `tool` with `input`
        pub fn tool_response(tool: &str, input: serde_json::Value) -> CompletionResponse {
            CompletionResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call-1".to_string(),
                    name: tool.to_string(),
                    input,
                }],
                stop_reason: StopReason::ToolUse,
                usage: TokenUsage::default(),
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let mut responses = self.responses.lock().expect("mock poisoned");
            if responses.is_empty() {
                return Err(LlmError::InvalidResponse("No more mock responses".to_string()));
            }
            responses.remove(0)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_pops_in_order() {
            let client = MockLlmClient::new(vec![
                Ok(MockLlmClient::tool_response("a", serde_json::json!({}))),
                Err(LlmError::Disabled),
            ]);

            let req = CompletionRequest {
                system_prompt: "Test".to_string(),
                messages: vec![],
                tools: vec![],
                max_tokens: 100,
            };

            let first = client.complete(req.clone()).await.unwrap();
            assert_eq!(first.tool_calls[0].name, "a");

            assert!(client.complete(req.clone()).await.is_err());
            // Exhausted
            assert!(client.complete(req).await.is_err());
        }
    }
}
