//! Clarification questions surfaced to the user

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single targeted question used to resolve missing step information
///
/// Questions are generated fresh on every pipeline run and are not persisted;
/// the caller echoes `field -> answer` back verbatim on the follow-up call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationQuestion {
    /// Stable key matched against the eventual answer
    pub field: String,

    /// Prompt text shown to the user
    pub question: String,

    /// Choice list; empty means free text
    #[serde(default)]
    pub options: Vec<String>,

    /// Whether the task can finalize without this answer
    pub required: bool,

    /// MicroStep ids this answer will update
    pub affected_step_ids: BTreeSet<String>,
}

impl ClarificationQuestion {
    /// Free-text question over a field
    pub fn free_text(field: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            question: question.into(),
            options: Vec::new(),
            required: true,
            affected_step_ids: BTreeSet::new(),
        }
    }

    /// Multiple-choice question over a field
    pub fn with_options(field: impl Into<String>, question: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            field: field.into(),
            question: question.into(),
            options,
            required: true,
            affected_step_ids: BTreeSet::new(),
        }
    }
}
