//! Hybrid step classifier
//!
//! Assigns each micro-step a leaf type (DIGITAL / HUMAN / UNKNOWN) and a
//! confidence. A keyword rule pass runs first and is accepted outright when
//! confident enough, which keeps most classifications off the LLM entirely.
//! Below the threshold, one LLM call constrained to the three-way enum is
//! merged with the rule signal. Required-field slots are detected by diffing
//! the step's entity mentions against the knowledge-graph context.
//!
//! A step is UNKNOWN iff its final confidence is below the threshold OR at
//! least one required slot is unresolved, whichever is broader.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::OnceLock;

use entitystore::KnowledgeGraphContext;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{LeafType, MicroStep, ParsedIntent};
use crate::llm::{CompletionRequest, LlmClient, Message, ToolDefinition};

/// Confidence haircut when the LLM path fails and only the rule signal remains
const DEGRADED_FACTOR: f32 = 0.9;

/// Verb phrases leaning DIGITAL (automatable by software)
const DIGITAL_HINTS: &[&str] = &[
    "send", "search", "look up", "google", "find", "order", "pay", "book", "schedule", "upload", "download", "post",
    "submit", "register", "renew", "transfer", "unsubscribe", "browse", "install", "sync", "set a reminder",
    "set reminder", "add to calendar", "text", "forward", "reply",
];

/// Verb phrases leaning HUMAN (physical or cognitive work)
const HUMAN_HINTS: &[&str] = &[
    "draft", "write", "compose", "clean", "wash", "fold", "walk", "carry", "pick up", "put away", "water", "wipe",
    "vacuum", "pack", "unpack", "move", "bring", "gather", "organize", "exercise", "cook", "chop", "call", "talk",
    "discuss", "read", "review", "decide", "brainstorm", "practice", "measure", "sort", "label", "sweep", "mop",
    "repair", "assemble", "sign",
];

/// Shared context the classifier reads per task
pub struct TaskContext<'a> {
    pub intent: &'a ParsedIntent,
    pub knowledge: &'a KnowledgeGraphContext,
}

/// Classifier thresholds
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Confidence at or above which a classification is accepted
    pub confidence_threshold: f32,

    /// Weight of the LLM signal in the merge
    pub llm_weight: f32,

    /// Max tokens for the classification response
    pub max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            llm_weight: 0.6,
            max_tokens: 1024,
        }
    }
}

/// LLM output schema for one classification
#[derive(Debug, Clone, Deserialize)]
struct ClassificationOutput {
    leaf_type: LeafType,
    confidence: f32,
}

/// Hybrid keyword + LLM step classifier
pub struct StepClassifier {
    llm: Arc<dyn LlmClient>,
    config: ClassifierConfig,
}

impl StepClassifier {
    /// Create a new classifier
    pub fn new(llm: Arc<dyn LlmClient>, config: ClassifierConfig) -> Self {
        Self { llm, config }
    }

    /// Classify every step in place, strictly in order
    pub async fn classify_all(&self, steps: &mut [MicroStep], ctx: &TaskContext<'_>) {
        for step in steps.iter_mut() {
            self.classify_step(step, ctx).await;
        }
    }

    /// Re-classify only the steps whose ids are listed; all others untouched
    ///
    /// This is the post-resolution pass: scoping is a correctness contract,
    /// not an optimization, because untouched steps must keep their prior
    /// classification byte for byte.
    pub async fn classify_scoped(&self, steps: &mut [MicroStep], ids: &BTreeSet<String>, ctx: &TaskContext<'_>) {
        for step in steps.iter_mut().filter(|s| ids.contains(&s.id)) {
            self.classify_step(step, ctx).await;
        }
    }

    /// Classify one step in place
    pub async fn classify_step(&self, step: &mut MicroStep, ctx: &TaskContext<'_>) {
        let required = detect_required_fields(&step.description, ctx.intent, ctx.knowledge);
        let (rule_leaf, rule_conf) = rule_pass(&step.description);

        let (mut leaf, confidence) = if rule_conf >= self.config.confidence_threshold {
            // Rule pass is confident enough; skip the LLM call
            debug!(step_id = %step.id, leaf = %rule_leaf, confidence = rule_conf, "classify: rule pass accepted");
            (rule_leaf, rule_conf)
        } else {
            match self.llm_classify(step).await {
                Ok((llm_leaf, llm_conf)) => {
                    merge_signals(rule_leaf, rule_conf, llm_leaf, llm_conf, self.config.llm_weight)
                }
                Err(reason) => {
                    warn!(step_id = %step.id, %reason, "classify: LLM unavailable, keeping degraded rule signal");
                    (rule_leaf, rule_conf * DEGRADED_FACTOR)
                }
            }
        };

        if confidence < self.config.confidence_threshold {
            leaf = LeafType::Unknown;
        }
        if !required.is_empty() {
            leaf = LeafType::Unknown;
        }

        // Manual steps are at least 2 minutes by contract
        if leaf == LeafType::Human && step.estimated_minutes < 2 {
            step.estimated_minutes = 2;
        }

        step.leaf_type = leaf;
        step.confidence = confidence.clamp(0.0, 1.0);
        step.required_fields = required;
    }

    /// One LLM call constrained to the three-way enum
    async fn llm_classify(&self, step: &MicroStep) -> Result<(LeafType, f32), String> {
        let request = CompletionRequest {
            system_prompt: CLASSIFY_PROMPT.to_string(),
            messages: vec![Message::user(format!("Step: {}", step.description))],
            tools: vec![classification_tool()],
            max_tokens: self.config.max_tokens,
        };

        let response = self.llm.complete(request).await.map_err(|e| e.to_string())?;

        let call = response
            .tool_call("submit_classification")
            .ok_or_else(|| "no submit_classification tool call in response".to_string())?;

        let output: ClassificationOutput =
            serde_json::from_value(call.input.clone()).map_err(|e| format!("schema mismatch: {}", e))?;

        Ok((output.leaf_type, output.confidence.clamp(0.0, 1.0)))
    }
}

/// Keyword rule pass over the step description
///
/// Confidence scales with how one-sided the hint counts are; a tie or no
/// hits at all stays UNKNOWN-leaning so the LLM (or a clarification) decides.
pub fn rule_pass(description: &str) -> (LeafType, f32) {
    let lower = description.to_lowercase();
    let digital_hits = DIGITAL_HINTS.iter().filter(|h| lower.contains(*h)).count();
    let human_hits = HUMAN_HINTS.iter().filter(|h| lower.contains(*h)).count();

    if digital_hits == 0 && human_hits == 0 {
        return (LeafType::Unknown, 0.3);
    }
    if digital_hits == human_hits {
        return (LeafType::Unknown, 0.4);
    }

    let (leaf, diff) = if digital_hits > human_hits {
        (LeafType::Digital, digital_hits - human_hits)
    } else {
        (LeafType::Human, human_hits - digital_hits)
    };

    (leaf, 0.7 + 0.1 * diff.min(2) as f32)
}

/// Merge the rule and LLM signals into one classification
fn merge_signals(
    rule_leaf: LeafType,
    rule_conf: f32,
    llm_leaf: LeafType,
    llm_conf: f32,
    llm_weight: f32,
) -> (LeafType, f32) {
    if llm_leaf == rule_leaf {
        let merged = (llm_weight * llm_conf + (1.0 - llm_weight) * rule_conf).clamp(0.0, 1.0);
        return (llm_leaf, merged);
    }

    // Disagreement: the weighted-stronger signal wins but certainty drops
    // with the size of the losing share.
    let llm_score = llm_weight * llm_conf;
    let rule_score = (1.0 - llm_weight) * rule_conf;
    let total = llm_score + rule_score;
    if total <= f32::EPSILON {
        return (LeafType::Unknown, 0.0);
    }

    if llm_score >= rule_score {
        (llm_leaf, llm_conf * (llm_score / total))
    } else {
        (rule_leaf, rule_conf * (rule_score / total))
    }
}

// Slot detection

struct SlotRule {
    field: &'static str,
    /// The step mentions this kind of entity
    trigger: Regex,
    /// The value is already spelled out in the step text
    value_present: Regex,
    /// Entity field key to look the value up by name in the knowledge graph
    entity_field: Option<&'static str>,
}

fn slot_rules() -> &'static [SlotRule] {
    static RULES: OnceLock<Vec<SlotRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            SlotRule {
                field: "email_recipient",
                trigger: Regex::new(r"(?i)\b(send|forward|reply)\b.*\bemail\b|\bemail address\b|\bemail\b\s+to\b")
                    .expect("static regex"),
                value_present: Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").expect("static regex"),
                entity_field: Some("email"),
            },
            SlotRule {
                field: "phone_number",
                trigger: Regex::new(r"(?i)\b(call|phone|dial|text)\b").expect("static regex"),
                value_present: Regex::new(r"\+?\d[\d().\s-]{6,}").expect("static regex"),
                entity_field: Some("phone"),
            },
            SlotRule {
                field: "meeting_time",
                trigger: Regex::new(r"(?i)\b(schedule|meeting|appointment|reminder)\b").expect("static regex"),
                value_present: Regex::new(
                    r"(?i)\b\d{1,2}(:\d{2})?\s*(am|pm)\b|\b(today|tonight|tomorrow|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
                )
                .expect("static regex"),
                entity_field: None,
            },
            SlotRule {
                field: "location",
                trigger: Regex::new(r"(?i)\b(drop off|deliver|drive to|go to)\b").expect("static regex"),
                value_present: Regex::new(r"(?i)\bat\s+[a-z0-9]").expect("static regex"),
                entity_field: None,
            },
        ]
    })
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z][a-z0-9_]*)\}").expect("static regex"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z][a-z]+)(?:'s|\x{2019}s)?\b").expect("static regex"))
}

/// Fields the step still needs before it can be acted on
///
/// Three signals, in order: explicit `{placeholder}` markers left by the
/// decomposer, then slot rules whose value is neither spelled out in the
/// text nor resolvable through the knowledge graph. Temporal and location
/// slots count as resolved when the parsed intent already carries them.
pub fn detect_required_fields(
    description: &str,
    intent: &ParsedIntent,
    knowledge: &KnowledgeGraphContext,
) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();

    for cap in placeholder_regex().captures_iter(description) {
        fields.insert(cap[1].to_string());
    }

    for rule in slot_rules() {
        if !rule.trigger.is_match(description) {
            continue;
        }
        if rule.value_present.is_match(description) {
            continue;
        }
        match rule.field {
            "meeting_time" if intent.when.is_some() => continue,
            "location" if intent.location.is_some() => continue,
            _ => {}
        }
        if let Some(entity_field) = rule.entity_field
            && mentioned_names(description, intent)
                .iter()
                .any(|name| knowledge.has_value_for(name, entity_field))
        {
            continue;
        }
        fields.insert(rule.field.to_string());
    }

    fields
}

/// Candidate entity names mentioned by the step or the parsed intent
///
/// The leading word is skipped: step descriptions are imperative, so the
/// first capitalized token is the verb.
fn mentioned_names(description: &str, intent: &ParsedIntent) -> Vec<String> {
    let mut names: Vec<String> = name_regex()
        .captures_iter(description)
        .filter_map(|cap| {
            let m = cap.get(1)?;
            if m.start() == 0 { None } else { Some(m.as_str().to_string()) }
        })
        .collect();

    if let Some(target) = &intent.target {
        names.push(target.clone());
    }

    names
}

fn classification_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_classification",
        "Submit the classification for this step. Call this exactly once.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "leaf_type": {
                    "type": "string",
                    "enum": ["DIGITAL", "HUMAN", "UNKNOWN"],
                    "description": "DIGITAL if software could do it alone, HUMAN if a person must act, UNKNOWN if it cannot be determined"
                },
                "confidence": {
                    "type": "number",
                    "description": "Certainty between 0 and 1"
                }
            },
            "required": ["leaf_type", "confidence"]
        }),
    )
}

/// System prompt for the LLM classification path
const CLASSIFY_PROMPT: &str = r#"You classify one micro-step of a task.

- DIGITAL: software or an agent could complete the step without a person (sending a prepared email, looking something up, placing an online order)
- HUMAN: a person must physically or mentally do it (cleaning, deciding, writing original content, speaking to someone)
- UNKNOWN: the step is too ambiguous to tell

Call submit_classification exactly once.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::NullLlmClient;
    use entitystore::{Entity, EntityKind};

    fn empty_ctx() -> KnowledgeGraphContext {
        KnowledgeGraphContext::empty("test")
    }

    fn ctx_with_sara() -> KnowledgeGraphContext {
        let mut sara = Entity::new(EntityKind::Contact, "Sara");
        sara.set_field("email", "sara@co.com");
        KnowledgeGraphContext {
            user: "test".to_string(),
            entities: vec![sara],
        }
    }

    #[test]
    fn test_rule_pass_digital() {
        let (leaf, conf) = rule_pass("Send email");
        assert_eq!(leaf, LeafType::Digital);
        assert!(conf >= 0.75);
    }

    #[test]
    fn test_rule_pass_human() {
        let (leaf, conf) = rule_pass("Draft email message");
        assert_eq!(leaf, LeafType::Human);
        assert!(conf >= 0.75);

        let (leaf, _) = rule_pass("Fold the laundry");
        assert_eq!(leaf, LeafType::Human);
    }

    #[test]
    fn test_rule_pass_no_hits() {
        let (leaf, conf) = rule_pass("mustard");
        assert_eq!(leaf, LeafType::Unknown);
        assert!(conf < 0.75);
    }

    #[test]
    fn test_detect_required_fields_email_lookup() {
        let intent = ParsedIntent::default();
        let fields = detect_required_fields("Find Sara's email address", &intent, &empty_ctx());
        assert!(fields.contains("email_recipient"));
    }

    #[test]
    fn test_detect_required_fields_send_email() {
        let intent = ParsedIntent::default();
        let fields = detect_required_fields("Send email", &intent, &empty_ctx());
        assert!(fields.contains("email_recipient"));
    }

    #[test]
    fn test_detect_required_fields_draft_is_clean() {
        let intent = ParsedIntent::default();
        let fields = detect_required_fields("Draft email message", &intent, &empty_ctx());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_known_contact_resolves_email_slot() {
        let intent = ParsedIntent::default();
        let fields = detect_required_fields("Find Sara's email address", &intent, &ctx_with_sara());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_literal_value_resolves_slot() {
        let intent = ParsedIntent::default();
        let fields = detect_required_fields("Send email (sara@co.com)", &intent, &empty_ctx());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_placeholder_detection() {
        let intent = ParsedIntent::default();
        let fields = detect_required_fields("Print the {document_name} for tomorrow", &intent, &empty_ctx());
        assert!(fields.contains("document_name"));
    }

    #[test]
    fn test_intent_when_resolves_meeting_time() {
        let mut intent = ParsedIntent::default();
        let fields = detect_required_fields("Schedule dentist appointment", &intent, &empty_ctx());
        assert!(fields.contains("meeting_time"));

        intent.when = Some("tomorrow".to_string());
        let fields = detect_required_fields("Schedule dentist appointment", &intent, &empty_ctx());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_merge_signals_agreement() {
        let (leaf, conf) = merge_signals(LeafType::Digital, 0.6, LeafType::Digital, 0.9, 0.6);
        assert_eq!(leaf, LeafType::Digital);
        assert!((conf - 0.78).abs() < 0.001);
    }

    #[test]
    fn test_merge_signals_disagreement_lowers_confidence() {
        let (leaf, conf) = merge_signals(LeafType::Digital, 0.6, LeafType::Human, 0.8, 0.6);
        assert_eq!(leaf, LeafType::Human);
        assert!(conf < 0.75);
    }

    #[tokio::test]
    async fn test_classify_all_sara_steps_rule_only() {
        let classifier = StepClassifier::new(Arc::new(NullLlmClient), ClassifierConfig::default());
        let intent = ParsedIntent {
            target: Some("Sara".to_string()),
            ..ParsedIntent::default()
        };
        let knowledge = empty_ctx();
        let ctx = TaskContext {
            intent: &intent,
            knowledge: &knowledge,
        };

        let mut steps = vec![
            MicroStep::new("t", 1, "Find Sara's email address"),
            MicroStep::new("t", 2, "Draft email message"),
            MicroStep::new("t", 3, "Send email"),
        ];
        classifier.classify_all(&mut steps, &ctx).await;

        // Steps 1 and 3 want the recipient, step 2 is plain manual work
        assert_eq!(steps[0].leaf_type, LeafType::Unknown);
        assert!(steps[0].required_fields.contains("email_recipient"));
        assert_eq!(steps[1].leaf_type, LeafType::Human);
        assert!(steps[1].required_fields.is_empty());
        assert_eq!(steps[2].leaf_type, LeafType::Unknown);
        assert!(steps[2].required_fields.contains("email_recipient"));
    }

    #[tokio::test]
    async fn test_classify_scoped_leaves_others_untouched() {
        let classifier = StepClassifier::new(Arc::new(NullLlmClient), ClassifierConfig::default());
        let intent = ParsedIntent::default();
        let knowledge = empty_ctx();
        let ctx = TaskContext {
            intent: &intent,
            knowledge: &knowledge,
        };

        let mut steps = vec![MicroStep::new("t", 1, "Send email"), MicroStep::new("t", 2, "Fold the laundry")];
        let untouched_before = steps[1].clone();

        let mut ids = BTreeSet::new();
        ids.insert(steps[0].id.clone());
        classifier.classify_scoped(&mut steps, &ids, &ctx).await;

        assert_ne!(steps[0].confidence, 0.0);
        assert_eq!(steps[1], untouched_before);
    }

    #[tokio::test]
    async fn test_human_minutes_floor() {
        let classifier = StepClassifier::new(Arc::new(NullLlmClient), ClassifierConfig::default());
        let intent = ParsedIntent::default();
        let knowledge = empty_ctx();
        let ctx = TaskContext {
            intent: &intent,
            knowledge: &knowledge,
        };

        let mut step = MicroStep::new("t", 1, "Fold the laundry");
        step.estimated_minutes = 0;
        classifier.classify_step(&mut step, &ctx).await;

        assert_eq!(step.leaf_type, LeafType::Human);
        assert!(step.estimated_minutes >= 2);
    }
}
