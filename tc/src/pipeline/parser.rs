//! Intent parser - extracts structured intent from capture text
//!
//! Primary path is one LLM call with a `submit_intent` tool whose schema
//! mirrors `ParsedIntent`. Any failure (transport, schema, missing tool call)
//! drops to a deterministic keyword extractor that never fails and never
//! claims confidence above 0.5.

use std::sync::Arc;

use entitystore::KnowledgeGraphContext;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::StageOutcome;
use super::normalize::NormalizedText;
use crate::domain::{ParsedIntent, Priority};
use crate::llm::{CompletionRequest, LlmClient, Message, ToolDefinition};

/// Ceiling on fallback confidence; the heuristic is a guess, not an answer
const FALLBACK_CONFIDENCE: f32 = 0.4;

/// Verbs the fallback extractor recognizes as actions
const KNOWN_VERBS: &[&str] = &[
    "send", "email", "buy", "call", "clean", "write", "schedule", "book", "pay", "order", "fix", "read", "plan",
    "wash", "find", "text", "organize", "make", "take", "get", "pick", "drop", "return", "cancel", "renew", "water",
    "walk", "submit", "review", "print", "pack",
];

/// Parses raw capture text into a `ParsedIntent`
pub struct IntentParser {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl IntentParser {
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Extract intent, falling back to the keyword heuristic on any failure
    pub async fn parse(&self, text: &NormalizedText, knowledge: &KnowledgeGraphContext) -> StageOutcome<ParsedIntent> {
        let request = CompletionRequest {
            system_prompt: self.build_system_prompt(knowledge),
            messages: vec![Message::user(text.as_str())],
            tools: vec![intent_tool()],
            max_tokens: self.max_tokens,
        };

        match self.llm.complete(request).await {
            Ok(response) => match Self::parse_intent_response(&response) {
                Ok(mut intent) => {
                    sanitize_intent(&mut intent, text);
                    info!(action = %intent.action, confidence = intent.confidence, "parse: intent extracted");
                    StageOutcome::Primary(intent)
                }
                Err(reason) => {
                    warn!(%reason, "parse: response rejected, using fallback extractor");
                    StageOutcome::Fallback {
                        value: fallback_intent(text),
                        reason,
                    }
                }
            },
            Err(e) => {
                warn!(error = %e, "parse: LLM unavailable, using fallback extractor");
                StageOutcome::Fallback {
                    value: fallback_intent(text),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn build_system_prompt(&self, knowledge: &KnowledgeGraphContext) -> String {
        let mut prompt = PARSE_PROMPT.to_string();

        let names: Vec<&str> = knowledge.entities.iter().map(|e| e.name.as_str()).collect();
        if !names.is_empty() {
            prompt.push_str("\n\n## Known entities\n");
            for name in names {
                prompt.push_str(&format!("- {}\n", name));
            }
        }

        prompt
    }

    /// Pull the submit_intent tool call out of the response
    fn parse_intent_response(response: &crate::llm::CompletionResponse) -> Result<ParsedIntent, String> {
        if let Some(call) = response.tool_call("submit_intent") {
            return serde_json::from_value(call.input.clone()).map_err(|e| format!("schema mismatch: {}", e));
        }

        // No tool call; accept raw JSON content as a lenient fallback
        if let Some(content) = &response.content
            && let Ok(intent) = serde_json::from_str::<ParsedIntent>(content)
        {
            return Ok(intent);
        }

        Err("no submit_intent tool call in response".to_string())
    }
}

/// Clamp model output into the ranges the rest of the pipeline relies on
fn sanitize_intent(intent: &mut ParsedIntent, text: &NormalizedText) {
    intent.confidence = intent.confidence.clamp(0.0, 1.0);
    intent.estimated_hours = intent.estimated_hours.max(0.0);
    if intent.title.trim().is_empty() {
        intent.title = truncate_title(text.as_str());
    }
    if intent.description.trim().is_empty() {
        intent.description = text.as_str().to_string();
    }
}

/// Deterministic keyword/regex extractor; always succeeds
pub fn fallback_intent(text: &NormalizedText) -> ParsedIntent {
    let raw = text.as_str();
    let lower = raw.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    let action = words
        .iter()
        .find(|w| KNOWN_VERBS.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .unwrap_or_else(|| words.first().map(|w| w.to_string()).unwrap_or_default());

    let action_pos = words.iter().position(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == action);
    let object = action_pos
        .and_then(|i| words.get(i + 1))
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .unwrap_or_default();

    let target = target_regex()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let when = when_regex().find(&lower).map(|m| m.as_str().to_string());

    let priority = if priority_high_regex().is_match(&lower) {
        Priority::High
    } else if priority_low_regex().is_match(&lower) {
        Priority::Low
    } else {
        Priority::Medium
    };

    debug!(%action, %object, ?target, "fallback_intent: extracted");

    ParsedIntent {
        action,
        object,
        target,
        when,
        location: None,
        context: None,
        confidence: FALLBACK_CONFIDENCE,
        title: truncate_title(raw),
        description: raw.to_string(),
        priority,
        estimated_hours: 0.25,
        tags: Vec::new(),
    }
}

/// Clean and truncate raw text into a usable title
fn truncate_title(raw: &str) -> String {
    let cleaned: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut title: String = cleaned.chars().take(60).collect();
    if cleaned.chars().count() > 60 {
        // Cut at the last full word
        if let Some(idx) = title.rfind(' ') {
            title.truncate(idx);
        }
        title.push_str("...");
    }
    title
}

fn target_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:to|for|with)\s+([A-Z][a-zA-Z]+)").expect("static regex"))
}

fn when_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(today|tonight|tomorrow|monday|tuesday|wednesday|thursday|friday|saturday|sunday|next week|this week|by \w+day)\b")
            .expect("static regex")
    })
}

fn priority_high_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(urgent|asap|important|immediately|now)\b").expect("static regex"))
}

fn priority_low_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(sometime|whenever|eventually|someday|no rush)\b").expect("static regex"))
}

fn intent_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_intent",
        "Submit the structured intent extracted from the task text. Call this exactly once.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "Main verb of the task, lowercase"
                },
                "object": {
                    "type": "string",
                    "description": "Direct object of the action"
                },
                "target": {
                    "type": ["string", "null"],
                    "description": "Who or what the action is aimed at"
                },
                "when": {
                    "type": ["string", "null"],
                    "description": "Temporal information exactly as stated"
                },
                "where": {
                    "type": ["string", "null"],
                    "description": "Location information exactly as stated"
                },
                "context": {
                    "type": ["string", "null"],
                    "description": "Any remaining context worth keeping"
                },
                "confidence": {
                    "type": "number",
                    "description": "Extraction certainty between 0 and 1"
                },
                "title": {
                    "type": "string",
                    "description": "Short task title, at most 8 words"
                },
                "description": {
                    "type": "string",
                    "description": "Task description, may restate the input"
                },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"]
                },
                "estimated_hours": {
                    "type": "number",
                    "description": "Rough total effort in hours"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["action", "object", "confidence", "title", "description", "priority", "estimated_hours"]
        }),
    )
}

/// System prompt for intent extraction
const PARSE_PROMPT: &str = r#"You extract structured intent from short task descriptions written by people with ADHD.

The text is informal and may be fragmentary. Extract:
1. The core action (verb) and its object
2. Target person/thing, time, and place when present
3. A short title and a cleaned-up description
4. Priority and a rough effort estimate in hours

Guidelines:
- Do not invent information that is not in the text
- Leave target/when/where null when the text does not say
- Confidence reflects how unambiguous the text was
- Prefer medium priority unless the text signals otherwise

Call submit_intent exactly once with the result.
"#;
