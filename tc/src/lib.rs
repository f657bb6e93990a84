//! taskcapture - ADHD-oriented task capture and decomposition
//!
//! Free text goes in; a structured `Task` with an ordered list of 2-5 minute
//! `MicroStep`s comes out, each tagged DIGITAL (automatable), HUMAN (needs a
//! person), or UNKNOWN (missing information). UNKNOWN steps produce targeted
//! clarification questions; answering them re-classifies only the affected
//! steps and re-finalizes the same task.
//!
//! # Core Concepts
//!
//! - **Graceful degradation**: every LLM-backed stage has a deterministic
//!   fallback; the pipeline produces a valid response even with no model at
//!   all, just with lower confidence and more questions
//! - **Sessions by value**: a capture in progress is an explicit
//!   `CaptureSession` handed through the persistence boundary, never process
//!   state, so concurrent requests need no coordination
//! - **Scoped re-classification**: clarification answers re-classify only the
//!   steps that asked; everything else stays byte-for-byte identical
//!
//! # Modules
//!
//! - [`pipeline`] - the capture and clarify flows, stage by stage
//! - [`llm`] - LLM client trait, Anthropic implementation, concurrency gate
//! - [`domain`] - Task, MicroStep, clarification, and session types
//! - [`store`] - session persistence boundary
//! - [`api`] - HTTP reference binding (axum)
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{
    Breakdown, CaptureSession, ClarificationQuestion, LeafType, MicroStep, ParsedIntent, Priority, SessionState, Task,
};
pub use error::CaptureError;
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmGate, NullLlmClient};
pub use pipeline::{CapturePipeline, CaptureRequest, CaptureResponse, ClarifyRequest, StageOutcome};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError};
