//! Clarification engine
//!
//! Turns the unresolved fields of UNKNOWN steps into targeted questions. One
//! question per distinct field no matter how many steps share it; questions
//! come out in the order fields first appear scanning steps in execution
//! order, so output is stable for a given step list.

use std::collections::{BTreeMap, BTreeSet};

use entitystore::{EntityKind, KnowledgeGraphContext};
use tracing::debug;

use crate::domain::{ClarificationQuestion, MicroStep};

/// Above this many known candidates the question falls back to free text
const MAX_OPTIONS: usize = 6;

/// Generate clarification questions for the current step list
///
/// Zero UNKNOWN steps (or UNKNOWN steps carrying no required fields) produce
/// an empty list.
pub fn generate_clarifications(steps: &[MicroStep], knowledge: &KnowledgeGraphContext) -> Vec<ClarificationQuestion> {
    let mut field_order: Vec<String> = Vec::new();
    let mut affected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    let mut ordered: Vec<&MicroStep> = steps.iter().filter(|s| s.is_unknown()).collect();
    ordered.sort_by_key(|s| s.step_number);

    for step in ordered {
        for field in &step.required_fields {
            if !affected.contains_key(field) {
                field_order.push(field.clone());
            }
            affected.entry(field.clone()).or_default().insert(step.id.clone());
        }
    }

    debug!(question_count = field_order.len(), "generate_clarifications: fields collected");

    field_order
        .into_iter()
        .map(|field| {
            let mut question = question_for(&field, knowledge);
            question.affected_step_ids = affected.remove(&field).unwrap_or_default();
            question
        })
        .collect()
}

/// Build the question for one field, multiple-choice when the knowledge
/// graph holds a small closed candidate set
fn question_for(field: &str, knowledge: &KnowledgeGraphContext) -> ClarificationQuestion {
    match field {
        "email_recipient" => {
            let options = knowledge.known_values("email");
            if !options.is_empty() && options.len() <= MAX_OPTIONS {
                ClarificationQuestion::with_options(field, "What email address should this go to?", options)
            } else {
                ClarificationQuestion::free_text(field, "What email address should this go to?")
            }
        }
        "email_account" => {
            let options = knowledge.names_with_field(EntityKind::Account, "email");
            if !options.is_empty() && options.len() <= MAX_OPTIONS {
                ClarificationQuestion::with_options(field, "Which email account should this be sent from?", options)
            } else {
                ClarificationQuestion::free_text(field, "Which email account should this be sent from?")
            }
        }
        "phone_number" => {
            let options = knowledge.known_values("phone");
            if !options.is_empty() && options.len() <= MAX_OPTIONS {
                ClarificationQuestion::with_options(field, "What phone number should be used?", options)
            } else {
                ClarificationQuestion::free_text(field, "What phone number should be used?")
            }
        }
        "meeting_time" => ClarificationQuestion::free_text(field, "When should this happen?"),
        "location" => ClarificationQuestion::free_text(field, "Where does this need to happen?"),
        other => ClarificationQuestion::free_text(other, format!("What is the {}?", humanize(other))),
    }
}

fn humanize(field: &str) -> String {
    field.replace('_', " ")
}
