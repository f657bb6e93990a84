//! Task domain type
//!
//! A Task is one user-captured unit of work. It is created by the finalizer
//! once decomposition completes and mutated only via re-finalization after
//! clarification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::id::generate_id;
use super::intent::ParsedIntent;
use super::now_ms;
use super::priority::Priority;

/// One user-captured unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, generated on first finalize
    pub id: String,

    /// Short title derived by the parser
    pub title: String,

    /// Free text, may equal the raw input
    pub description: String,

    /// low / medium / high
    pub priority: Priority,

    /// Derived estimate, >= 0
    pub estimated_hours: f32,

    /// Unordered label set
    pub tags: BTreeSet<String>,

    /// Creation timestamp (unix ms)
    pub created_at: i64,

    /// Last update timestamp (unix ms)
    pub updated_at: i64,
}

impl Task {
    /// Build a Task from parsed intent, minting a fresh ID
    pub fn from_intent(intent: &ParsedIntent) -> Self {
        let now = now_ms();
        Self {
            id: generate_id("task", &intent.title),
            title: intent.title.clone(),
            description: intent.description.clone(),
            priority: intent.priority,
            estimated_hours: intent.estimated_hours.max(0.0),
            tags: intent.tags.iter().cloned().collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a mutation
    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}
