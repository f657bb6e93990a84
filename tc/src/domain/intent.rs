//! Structured intent extracted from raw capture text

use serde::{Deserialize, Serialize};

use super::priority::Priority;

/// What the parser understood about the captured text
///
/// Every field is best-effort; the fallback extractor fills the same shape
/// with lower confidence when the model is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedIntent {
    /// Main verb ("send", "buy", "clean")
    pub action: String,

    /// Direct object of the action ("email", "groceries")
    pub object: String,

    /// Who or what the action is aimed at ("Sara", "landlord")
    pub target: Option<String>,

    /// Temporal information as stated ("tomorrow", "by friday")
    pub when: Option<String>,

    /// Location information as stated
    #[serde(rename = "where")]
    pub location: Option<String>,

    /// Any remaining context worth keeping
    pub context: Option<String>,

    /// Parser certainty in [0, 1]
    pub confidence: f32,

    /// Short task title
    pub title: String,

    /// Task description, may equal the raw input
    pub description: String,

    /// Derived priority
    pub priority: Priority,

    /// Rough effort estimate in hours
    pub estimated_hours: f32,

    /// Suggested labels
    pub tags: Vec<String>,
}
