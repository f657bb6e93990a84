//! Domain types for task capture
//!
//! A captured `Task` owns an ordered list of `MicroStep`s. Steps carry their
//! classification (`LeafType`), the fields still missing before they can be
//! acted on, and the clarification questions derived from those fields.

mod breakdown;
mod clarification;
mod id;
mod intent;
mod priority;
mod session;
mod step;
mod task;

pub use breakdown::Breakdown;
pub use clarification::ClarificationQuestion;
pub use id::{generate_id, slugify};
pub use intent::ParsedIntent;
pub use priority::Priority;
pub use session::{CaptureSession, SessionState};
pub use step::{LeafType, MicroStep, renumber};
pub use task::Task;

/// Current time as unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
