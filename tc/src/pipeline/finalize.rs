//! Finalizer - assembles the external response contract
//!
//! The terminal stage: recomputes the breakdown from the current step list,
//! derives `needs_clarification`, and packages everything the caller sees.
//! The task id is minted when the task is first built and reused verbatim on
//! every later finalize of the same session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Breakdown, CaptureSession, ClarificationQuestion, MicroStep, Task};

fn default_true() -> bool {
    true
}

/// Capture request: raw text plus caller policy flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Raw task text as typed or transcribed
    pub text: String,

    /// Caller intends to auto-run DIGITAL steps; logged and echoed, execution
    /// happens elsewhere
    #[serde(default)]
    pub auto_mode: bool,

    /// When false the caller treats UNKNOWN steps as best effort instead of
    /// blocking on answers; the response still reports truthfully
    #[serde(default = "default_true")]
    pub ask_for_clarity: bool,

    /// Knowledge-graph user; server default when absent
    #[serde(default)]
    pub user: Option<String>,
}

/// Clarify request: answers echoed back field-for-field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarifyRequest {
    pub task_id: String,

    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

/// Response contract shared by capture and clarify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub task: Task,
    pub micro_steps: Vec<MicroStep>,
    pub breakdown: Breakdown,
    pub needs_clarification: bool,
    pub clarifications: Vec<ClarificationQuestion>,
    pub processing_time_ms: u64,
}

/// Assembles `CaptureResponse`s from session state
pub struct Finalizer;

impl Finalizer {
    /// Build the response for the session's current state
    ///
    /// `needs_clarification` is derived from the recomputed breakdown, never
    /// set independently, so `needs_clarification == (unknown_count > 0)`
    /// holds for every response this function can produce.
    pub fn finalize(
        session: &CaptureSession,
        clarifications: Vec<ClarificationQuestion>,
        processing_time_ms: u64,
    ) -> CaptureResponse {
        let breakdown = Breakdown::from_steps(&session.steps);

        CaptureResponse {
            task: session.task.clone(),
            micro_steps: session.steps.clone(),
            breakdown,
            needs_clarification: breakdown.needs_clarification(),
            clarifications,
            processing_time_ms,
        }
    }
}
