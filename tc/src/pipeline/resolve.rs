//! Resolution engine
//!
//! Applies clarification answers to the steps that asked for them. Only
//! steps whose `required_fields` intersect the answer keys are touched;
//! everything else stays byte-for-byte identical, which is what lets the
//! scoped re-classification pass skip them safely.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::domain::MicroStep;

/// Substitute answers into the affected steps
///
/// Returns the ids of mutated steps, in step order. Answer keys that match
/// no step's `required_fields` are ignored; lenient clients may echo back
/// more than was asked.
pub fn resolve(steps: &mut [MicroStep], answers: &BTreeMap<String, String>) -> Vec<String> {
    let mut touched = Vec::new();

    for step in steps.iter_mut() {
        if !step.needs_any_of(answers.keys()) {
            continue;
        }

        let satisfied: Vec<String> = step
            .required_fields
            .iter()
            .filter(|f| answers.contains_key(*f))
            .cloned()
            .collect();

        for field in &satisfied {
            let answer = &answers[field];
            substitute(step, field, answer);
            step.required_fields.remove(field);
        }

        debug!(step_id = %step.id, fields = satisfied.len(), "resolve: step updated");
        touched.push(step.id.clone());
    }

    info!(touched = touched.len(), "resolve: answers applied");
    touched
}

/// Textual interpolation of one answer into a step description
///
/// Placeholder form (`{field}`) is replaced in place; otherwise the answer
/// is appended as a parenthetical so resolution works regardless of how the
/// decomposer phrased the step.
fn substitute(step: &mut MicroStep, field: &str, answer: &str) {
    let placeholder = format!("{{{}}}", field);
    if step.description.contains(&placeholder) {
        step.description = step.description.replace(&placeholder, answer);
    } else {
        step.description.push_str(&format!(" ({})", answer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_with_fields(n: u32, desc: &str, fields: &[&str]) -> MicroStep {
        let mut step = MicroStep::new("t", n, desc);
        for f in fields {
            step.required_fields.insert(f.to_string());
        }
        step
    }

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_placeholder_substitution() {
        let mut steps = vec![step_with_fields(1, "Send email to {email_recipient}", &["email_recipient"])];
        let touched = resolve(&mut steps, &answers(&[("email_recipient", "sara@co.com")]));

        assert_eq!(touched, vec![steps[0].id.clone()]);
        assert_eq!(steps[0].description, "Send email to sara@co.com");
        assert!(steps[0].required_fields.is_empty());
    }

    #[test]
    fn test_parenthetical_fallback() {
        let mut steps = vec![step_with_fields(1, "Send email", &["email_recipient"])];
        resolve(&mut steps, &answers(&[("email_recipient", "sara@co.com")]));

        assert_eq!(steps[0].description, "Send email (sara@co.com)");
    }

    #[test]
    fn test_untouched_steps_identical() {
        let mut steps = vec![
            step_with_fields(1, "Find the email address", &["email_recipient"]),
            step_with_fields(2, "Draft email message", &[]),
            step_with_fields(3, "Call the office", &["phone_number"]),
        ];
        let before_1 = steps[1].clone();
        let before_2 = steps[2].clone();

        let touched = resolve(&mut steps, &answers(&[("email_recipient", "x@y.com")]));

        assert_eq!(touched.len(), 1);
        assert_eq!(steps[1], before_1);
        assert_eq!(steps[2], before_2);
        // Serialized form identical too
        assert_eq!(
            serde_json::to_string(&steps[2]).unwrap(),
            serde_json::to_string(&before_2).unwrap()
        );
    }

    #[test]
    fn test_unknown_answer_keys_ignored() {
        let mut steps = vec![step_with_fields(1, "Send email", &["email_recipient"])];
        let touched = resolve(&mut steps, &answers(&[("shoe_size", "42")]));

        assert!(touched.is_empty());
        assert_eq!(steps[0].description, "Send email");
        assert!(steps[0].required_fields.contains("email_recipient"));
    }

    #[test]
    fn test_partial_answers_shrink_fields() {
        let mut steps = vec![step_with_fields(1, "Schedule the call", &["meeting_time", "phone_number"])];
        let touched = resolve(&mut steps, &answers(&[("meeting_time", "tomorrow 3pm")]));

        assert_eq!(touched.len(), 1);
        assert!(!steps[0].required_fields.contains("meeting_time"));
        assert!(steps[0].required_fields.contains("phone_number"));
    }

    #[test]
    fn test_empty_answers_touch_nothing() {
        let mut steps = vec![step_with_fields(1, "Send email", &["email_recipient"])];
        let before = steps[0].clone();
        let touched = resolve(&mut steps, &BTreeMap::new());

        assert!(touched.is_empty());
        assert_eq!(steps[0], before);
    }
}
