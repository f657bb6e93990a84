//! Capture & decomposition pipeline
//!
//! The request-scoped flow that turns raw text into a structured task graph:
//!
//! ```text
//! normalize -> parse -> decompose -> classify -> clarify -> finalize
//!                                        ^                     |
//!                                        |   resolve(answers)  |
//!                                        +---------------------+
//! ```
//!
//! Stages run strictly sequentially because each output feeds the next. The
//! only suspension points are the LLM calls, each bounded by the client
//! timeout; every LLM failure is absorbed at its stage boundary into a
//! deterministic fallback, so the pipeline degrades (lower confidence, more
//! UNKNOWN steps) instead of failing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use entitystore::KnowledgeGraphContext;
use tracing::info;

pub mod classifier;
pub mod clarify;
pub mod decomposer;
pub mod finalize;
pub mod normalize;
pub mod parser;
pub mod resolve;

pub use classifier::{ClassifierConfig, StepClassifier, TaskContext};
pub use clarify::generate_clarifications;
pub use decomposer::{DecomposerConfig, StepDecomposer};
pub use finalize::{CaptureRequest, CaptureResponse, ClarifyRequest, Finalizer};
pub use normalize::{NormalizedText, normalize};
pub use parser::IntentParser;
pub use resolve::resolve;

use crate::config::Config;
use crate::domain::{CaptureSession, LeafType, Task};
use crate::error::CaptureError;
use crate::llm::{LlmClient, LlmGate};

/// Outcome of a stage with a graceful-degradation path
///
/// Expected degraded paths are data, not exceptions: a fallback still carries
/// a full value plus the reason the primary path was abandoned.
#[derive(Debug, Clone)]
pub enum StageOutcome<T> {
    /// Primary (LLM) path succeeded
    Primary(T),
    /// Deterministic fallback was used
    Fallback { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    /// Borrow the value regardless of path
    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Primary(v) => v,
            StageOutcome::Fallback { value, .. } => value,
        }
    }

    /// Take the value regardless of path
    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Primary(v) => v,
            StageOutcome::Fallback { value, .. } => value,
        }
    }

    /// True when the deterministic fallback produced the value
    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }

    /// Why the primary path was abandoned, if it was
    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Primary(_) => None,
            StageOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// The stateless capture pipeline
///
/// Holds no per-request state; sessions travel by value through the
/// persistence boundary, so any number of capture/clarify requests may run
/// concurrently.
pub struct CapturePipeline {
    parser: IntentParser,
    decomposer: StepDecomposer,
    classifier: StepClassifier,
    gate: LlmGate,
    max_input_chars: usize,
}

impl CapturePipeline {
    /// Wire the pipeline onto an LLM client
    pub fn new(llm: Arc<dyn LlmClient>, config: &Config) -> Self {
        let parser = IntentParser::new(llm.clone(), config.llm.max_tokens);
        let decomposer = StepDecomposer::new(
            llm.clone(),
            DecomposerConfig {
                min_steps: config.pipeline.min_steps,
                max_steps: config.pipeline.max_steps,
                max_tokens: config.llm.max_tokens,
            },
        );
        let classifier = StepClassifier::new(
            llm,
            ClassifierConfig {
                confidence_threshold: config.pipeline.confidence_threshold,
                llm_weight: config.pipeline.llm_weight,
                max_tokens: config.llm.max_tokens.min(1024),
            },
        );
        let gate = LlmGate::new(
            config.concurrency.max_llm_requests,
            Duration::from_millis(config.concurrency.admission_timeout_ms),
        );

        Self {
            parser,
            decomposer,
            classifier,
            gate,
            max_input_chars: config.pipeline.max_input_chars,
        }
    }

    /// Run the full capture flow for one request
    ///
    /// Returns the session (for persistence) alongside the response contract.
    pub async fn capture(
        &self,
        request: &CaptureRequest,
        knowledge: &KnowledgeGraphContext,
    ) -> Result<(CaptureSession, CaptureResponse), CaptureError> {
        let started = Instant::now();

        let text = normalize(&request.text, self.max_input_chars)?;
        info!(
            chars = text.as_str().chars().count(),
            auto_mode = request.auto_mode,
            ask_for_clarity = request.ask_for_clarity,
            "capture: request accepted"
        );

        // One permit covers this request's sequential LLM calls
        let permit = self.gate.admit().await?;

        let intent = self.parser.parse(&text, knowledge).await.into_value();
        let task = Task::from_intent(&intent);

        let mut steps = self.decomposer.decompose(&text, &intent, &task.id).await.into_value();

        let ctx = TaskContext {
            intent: &intent,
            knowledge,
        };
        self.classifier.classify_all(&mut steps, &ctx).await;
        drop(permit);

        let clarifications = generate_clarifications(&steps, knowledge);
        let mut session = CaptureSession::new(task, intent, steps);
        session.user = request.user.clone();
        let response = Finalizer::finalize(&session, clarifications, started.elapsed().as_millis() as u64);

        info!(
            task_id = %session.task_id,
            total_steps = response.breakdown.total_steps,
            unknown = response.breakdown.unknown_count,
            needs_clarification = response.needs_clarification,
            "capture: finalized"
        );

        Ok((session, response))
    }

    /// Apply clarification answers and re-finalize
    ///
    /// Re-entrant, not a restart: only steps whose required fields intersect
    /// the answers are re-classified, every other step keeps its prior
    /// classification untouched. Empty answers are a no-op that re-finalizes
    /// the unchanged session.
    pub async fn clarify(
        &self,
        session: &mut CaptureSession,
        answers: &BTreeMap<String, String>,
        knowledge: &KnowledgeGraphContext,
    ) -> Result<CaptureResponse, CaptureError> {
        let started = Instant::now();

        let touched = resolve(&mut session.steps, answers);

        if !touched.is_empty() {
            let permit = self.gate.admit().await?;
            let ids: BTreeSet<String> = touched.into_iter().collect();
            let intent = session.intent.clone();
            let ctx = TaskContext {
                intent: &intent,
                knowledge,
            };
            self.classifier.classify_scoped(&mut session.steps, &ids, &ctx).await;
            drop(permit);

            // Retain-as-zero-duration: a resolved step that lands DIGITAL is
            // kept in place as a near-instant step rather than collapsed away
            for step in session.steps.iter_mut().filter(|s| ids.contains(&s.id)) {
                if step.leaf_type == LeafType::Digital {
                    step.estimated_minutes = 0;
                }
            }

            session.refresh_state();
        }

        let clarifications = generate_clarifications(&session.steps, knowledge);
        let response = Finalizer::finalize(session, clarifications, started.elapsed().as_millis() as u64);

        info!(
            task_id = %session.task_id,
            unknown = response.breakdown.unknown_count,
            needs_clarification = response.needs_clarification,
            "clarify: re-finalized"
        );

        Ok(response)
    }

    /// Response contract for a stored session without re-running anything
    pub fn snapshot(&self, session: &CaptureSession, knowledge: &KnowledgeGraphContext) -> CaptureResponse {
        let clarifications = generate_clarifications(&session.steps, knowledge);
        Finalizer::finalize(session, clarifications, 0)
    }
}
