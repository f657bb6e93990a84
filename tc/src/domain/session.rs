//! Capture session: the unit of state passed between capture and clarify
//!
//! A session is an explicit value `{task_id, task, intent, steps}` handed
//! through the persistence boundary between calls. Nothing about a capture
//! in progress lives in process globals, which keeps concurrent sessions
//! trivially safe.

use serde::{Deserialize, Serialize};

use super::intent::ParsedIntent;
use super::now_ms;
use super::step::MicroStep;
use super::task::Task;

/// Observable state of a finalized session
///
/// ANALYZING exists only inside a request; a stored session is always in one
/// of these two states. A session may stay in `NeedsClarification` forever,
/// which is a valid terminal condition, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// All steps classified, nothing left to ask
    Ready,
    /// At least one step is UNKNOWN and has open questions
    NeedsClarification,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NeedsClarification => write!(f, "needs_clarification"),
        }
    }
}

/// One capture's full state across the clarification round-trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSession {
    /// Stable across re-finalization; equals `task.id`
    pub task_id: String,

    /// Current observable state
    pub state: SessionState,

    /// Knowledge-graph user this capture belongs to, when the caller said
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// The captured task
    pub task: Task,

    /// Parser output the decomposition was built from
    pub intent: ParsedIntent,

    /// Ordered micro-steps
    pub steps: Vec<MicroStep>,

    /// Creation timestamp (unix ms)
    pub created_at: i64,

    /// Last update timestamp (unix ms)
    pub updated_at: i64,
}

impl CaptureSession {
    /// Assemble a new session around a freshly minted task
    pub fn new(task: Task, intent: ParsedIntent, steps: Vec<MicroStep>) -> Self {
        let now = now_ms();
        let state = if steps.iter().any(MicroStep::is_unknown) {
            SessionState::NeedsClarification
        } else {
            SessionState::Ready
        };
        Self {
            task_id: task.id.clone(),
            state,
            user: None,
            task,
            intent,
            steps,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh the state flag and timestamps after mutation
    pub fn refresh_state(&mut self) {
        self.state = if self.steps.iter().any(MicroStep::is_unknown) {
            SessionState::NeedsClarification
        } else {
            SessionState::Ready
        };
        self.updated_at = now_ms();
        self.task.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LeafType;

    fn session_with_unknown() -> CaptureSession {
        let mut intent = ParsedIntent::default();
        intent.title = "test".to_string();
        let task = Task::from_intent(&intent);
        let steps = vec![MicroStep::new(&task.id, 1, "do something")];
        CaptureSession::new(task, intent, steps)
    }

    #[test]
    fn test_new_session_state_from_steps() {
        let session = session_with_unknown();
        assert_eq!(session.state, SessionState::NeedsClarification);
        assert_eq!(session.task_id, session.task.id);
    }

    #[test]
    fn test_refresh_state_transitions_to_ready() {
        let mut session = session_with_unknown();
        session.steps[0].leaf_type = LeafType::Human;
        session.refresh_state();
        assert_eq!(session.state, SessionState::Ready);
    }
}
