//! Step decomposer - breaks a task into atomic micro-steps
//!
//! One LLM call with a `submit_steps` tool produces 3-7 steps of 2-5 minutes
//! each. Steps arrive unclassified (UNKNOWN, confidence 0) and are renumbered
//! densely in arrival order no matter what numbering the model used. The
//! fallback is a single step wrapping the whole task.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::StageOutcome;
use super::normalize::NormalizedText;
use crate::domain::{MicroStep, ParsedIntent, renumber};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, Message, ToolDefinition};

/// Fallback estimate when the model cannot split the task
const FALLBACK_MINUTES: u8 = 5;

/// Configuration for decomposition
#[derive(Debug, Clone)]
pub struct DecomposerConfig {
    /// Target range for step count
    pub min_steps: usize,
    pub max_steps: usize,

    /// Max tokens for the decomposition response
    pub max_tokens: u32,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            min_steps: 3,
            max_steps: 7,
            max_tokens: 4096,
        }
    }
}

/// LLM output schema for one step
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepOutput {
    /// Model-suggested position; ignored in favor of arrival order
    #[serde(default)]
    step_number: Option<u32>,

    /// Single atomic action
    description: String,

    /// Minutes estimate; clamped into 0-5
    #[serde(default)]
    estimated_minutes: Option<u32>,

    /// Emoji suggestion, cosmetic
    #[serde(default)]
    icon: Option<String>,
}

/// Full decomposition output from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecompositionOutput {
    steps: Vec<StepOutput>,
}

/// StepDecomposer breaks captured tasks into executable micro-steps
pub struct StepDecomposer {
    llm: Arc<dyn LlmClient>,
    config: DecomposerConfig,
}

impl StepDecomposer {
    /// Create a new decomposer
    pub fn new(llm: Arc<dyn LlmClient>, config: DecomposerConfig) -> Self {
        Self { llm, config }
    }

    /// Decompose a task into ordered micro-steps, all initially UNKNOWN
    pub async fn decompose(
        &self,
        text: &NormalizedText,
        intent: &ParsedIntent,
        task_id: &str,
    ) -> StageOutcome<Vec<MicroStep>> {
        let request = CompletionRequest {
            system_prompt: self.build_system_prompt(),
            messages: vec![Message::user(format!(
                "Task: {}\n\nParsed action: {} {}\n\nBreak this task into micro-steps.",
                text.as_str(),
                intent.action,
                intent.object
            ))],
            tools: vec![self.steps_tool()],
            max_tokens: self.config.max_tokens,
        };

        match self.llm.complete(request).await {
            Ok(response) => match Self::parse_steps_response(&response) {
                Ok(output) => {
                    let steps = self.build_steps(task_id, output);
                    info!(task_id, step_count = steps.len(), "decompose: task split into micro-steps");
                    StageOutcome::Primary(steps)
                }
                Err(reason) => {
                    warn!(%reason, "decompose: response rejected, using single-step fallback");
                    StageOutcome::Fallback {
                        value: fallback_steps(text, task_id),
                        reason,
                    }
                }
            },
            Err(e) => {
                warn!(error = %e, "decompose: LLM unavailable, using single-step fallback");
                StageOutcome::Fallback {
                    value: fallback_steps(text, task_id),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn build_system_prompt(&self) -> String {
        format!(
            "{}\n\nProduce between {} and {} steps.",
            DECOMPOSE_PROMPT, self.config.min_steps, self.config.max_steps
        )
    }

    fn steps_tool(&self) -> ToolDefinition {
        ToolDefinition::new(
            "submit_steps",
            "Submit the ordered micro-step decomposition. Call this once with all steps.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "steps": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "step_number": {
                                    "type": "integer",
                                    "description": "1-based position in execution order"
                                },
                                "description": {
                                    "type": "string",
                                    "description": "One atomic action. Mark missing information with {snake_case} placeholders, e.g. 'Send email to {email_recipient}'"
                                },
                                "estimated_minutes": {
                                    "type": "integer",
                                    "description": "2-5 for manual steps, 0 for near-instant automated steps"
                                },
                                "icon": {
                                    "type": "string",
                                    "description": "One emoji suggestion for this step"
                                }
                            },
                            "required": ["description"]
                        }
                    }
                },
                "required": ["steps"]
            }),
        )
    }

    /// Parse the submit_steps tool call out of the response
    fn parse_steps_response(response: &CompletionResponse) -> Result<DecompositionOutput, String> {
        if let Some(call) = response.tool_call("submit_steps") {
            let output: DecompositionOutput =
                serde_json::from_value(call.input.clone()).map_err(|e| format!("schema mismatch: {}", e))?;
            if output.steps.is_empty() {
                return Err("decomposition produced zero steps".to_string());
            }
            return Ok(output);
        }

        // No tool call; accept raw JSON content as a lenient fallback
        if let Some(content) = &response.content
            && let Ok(output) = serde_json::from_str::<DecompositionOutput>(content)
            && !output.steps.is_empty()
        {
            return Ok(output);
        }

        Err("no submit_steps tool call in response".to_string())
    }

    /// Build MicroStep objects, renumbering in arrival order
    fn build_steps(&self, task_id: &str, output: DecompositionOutput) -> Vec<MicroStep> {
        let mut steps: Vec<MicroStep> = output
            .steps
            .into_iter()
            .take(self.config.max_steps)
            .enumerate()
            .map(|(idx, out)| {
                let mut step = MicroStep::new(task_id, (idx + 1) as u32, out.description.trim());
                step.estimated_minutes = out.estimated_minutes.unwrap_or(u32::from(FALLBACK_MINUTES)).min(5) as u8;
                step.icon = out.icon.filter(|i| !i.trim().is_empty());
                step
            })
            .collect();

        renumber(&mut steps);
        steps
    }
}

/// Single-step fallback wrapping the whole task
pub fn fallback_steps(text: &NormalizedText, task_id: &str) -> Vec<MicroStep> {
    let mut step = MicroStep::new(task_id, 1, text.as_str());
    step.estimated_minutes = FALLBACK_MINUTES;
    vec![step]
}

/// System prompt for decomposition
const DECOMPOSE_PROMPT: &str = r#"You break tasks into tiny executable steps for people with ADHD.

Your job is to:
1. Read the task and understand the goal
2. Split it into atomic micro-steps of 2-5 minutes each
3. Order the steps so each one can start the moment the previous finishes
4. Suggest one emoji per step

Guidelines:
- Each step is one concrete action, never a project
- A step that software could do on its own may be 0 minutes
- When a step needs information the task does not give (an address, a
  recipient, a time), keep the step and mark the gap with a {snake_case}
  placeholder such as {email_recipient} or {meeting_time}
- Never invent specifics the task does not state

Call submit_steps once with all steps in execution order.
"#;
