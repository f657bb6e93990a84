//! EntityStore - knowledge-graph context for task capture
//!
//! Stores what the system already knows about a user's world (contacts,
//! accounts, places, recurring items) so the capture pipeline can resolve
//! entity references without asking the user again.
//!
//! # Architecture
//!
//! ```text
//! .entitystore/
//! ├── alice.json       # one knowledge document per user
//! └── bob.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use entitystore::{Entity, EntityKind, EntityStore};
//!
//! let store = EntityStore::open(".entitystore")?;
//! let mut sara = Entity::new(EntityKind::Contact, "Sara");
//! sara.set_field("email", "sara@co.com");
//! store.upsert("alice", sara)?;
//!
//! let ctx = store.get_context("alice")?;
//! assert!(ctx.has_value_for("Sara", "email"));
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{ContextProvider, Entity, EntityKind, EntityStore, KnowledgeGraphContext, NullContextProvider};

/// Default user when no identity is supplied by the caller
pub const DEFAULT_USER: &str = "default";
