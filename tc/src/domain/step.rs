//! MicroStep domain type
//!
//! A MicroStep is one atomic 2-5 minute unit inside a Task's execution plan.
//! Steps are created all-UNKNOWN by the decomposer, typed by the classifier,
//! and mutated in place by the resolution engine. Steps are never deleted,
//! only re-typed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::id::generate_id;

/// Classification of a micro-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeafType {
    /// Automatable by software or an agent
    Digital,
    /// Requires manual human action
    Human,
    /// Cannot be determined yet, usually for lack of information
    #[default]
    Unknown,
}

impl std::fmt::Display for LeafType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digital => write!(f, "DIGITAL"),
            Self::Human => write!(f, "HUMAN"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One atomic unit inside a Task's execution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroStep {
    /// Unique within the task (e.g. "019a42-step-draft-email-message")
    pub id: String,

    /// Back-reference to the owning task
    pub task_id: String,

    /// 1-based position in execution order, dense, no gaps
    pub step_number: u32,

    /// Human-readable instruction; mutable only during resolution
    pub description: String,

    /// 0-5 minutes; 0 permitted for DIGITAL meaning near-instant
    pub estimated_minutes: u8,

    /// Current classification
    pub leaf_type: LeafType,

    /// Classifier certainty in [0, 1]
    pub confidence: f32,

    /// Field names still missing before this step can be typed
    pub required_fields: BTreeSet<String>,

    /// Opaque emoji suggestion from the decomposer, cosmetic only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl MicroStep {
    /// Create an unclassified step
    pub fn new(task_id: impl Into<String>, step_number: u32, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            id: generate_id("step", &description),
            task_id: task_id.into(),
            step_number,
            description,
            estimated_minutes: 5,
            leaf_type: LeafType::Unknown,
            confidence: 0.0,
            required_fields: BTreeSet::new(),
            icon: None,
        }
    }

    /// True while the step cannot be acted on
    pub fn is_unknown(&self) -> bool {
        self.leaf_type == LeafType::Unknown
    }

    /// True when any of the given answer fields touch this step
    pub fn needs_any_of<'a>(&self, fields: impl IntoIterator<Item = &'a String>) -> bool {
        fields.into_iter().any(|f| self.required_fields.contains(f))
    }
}

/// Renumber steps densely 1..=N in their current order
///
/// Model output may carry arbitrary or conflicting step numbers; arrival
/// order wins and numbering is rebuilt deterministically.
pub fn renumber(steps: &mut [MicroStep]) {
    for (idx, step) in steps.iter_mut().enumerate() {
        step.step_number = (idx + 1) as u32;
    }
}
