//! Core EntityStore implementation

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Kind of entity the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A person the user communicates with
    Contact,
    /// A service account (email, calendar, shopping)
    Account,
    /// A physical or virtual place
    Place,
    /// Anything else worth remembering
    Item,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contact => write!(f, "contact"),
            Self::Account => write!(f, "account"),
            Self::Place => write!(f, "place"),
            Self::Item => write!(f, "item"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contact" => Ok(Self::Contact),
            "account" => Ok(Self::Account),
            "place" => Ok(Self::Place),
            "item" => Ok(Self::Item),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

/// A single known entity with its attribute fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: String,

    /// Entity kind
    pub kind: EntityKind,

    /// Display name used for reference matching ("Sara", "work email")
    pub name: String,

    /// Attribute fields, e.g. {"email": "sara@co.com", "phone": "+1..."}
    pub fields: BTreeMap<String, String>,

    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

impl Entity {
    /// Create a new entity with a generated ID
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind,
            name: name.into(),
            fields: BTreeMap::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Set an attribute field
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Get an attribute field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Case-insensitive name match (either direction of containment)
    fn matches_name(&self, reference: &str) -> bool {
        let name = self.name.to_lowercase();
        let reference = reference.to_lowercase();
        name == reference || name.contains(&reference) || reference.contains(&name)
    }
}

/// One user's knowledge document, serialized as `{user}.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KnowledgeDocument {
    #[serde(default)]
    entities: Vec<Entity>,
}

/// Read-only snapshot of what is known about a user's world
///
/// Handed to the capture pipeline per request; never written back from there.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraphContext {
    /// The user this snapshot belongs to
    pub user: String,

    /// All known entities
    pub entities: Vec<Entity>,
}

impl KnowledgeGraphContext {
    /// Empty context for a user
    pub fn empty(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            entities: Vec::new(),
        }
    }

    /// All entities of a kind
    pub fn entities_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Resolve a name reference to a known entity
    pub fn resolve_name(&self, reference: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.matches_name(reference))
    }

    /// True when a named entity carries a value for the given field
    pub fn has_value_for(&self, name: &str, field: &str) -> bool {
        self.resolve_name(name).and_then(|e| e.field(field)).is_some()
    }

    /// Distinct known values for a field across all entities, sorted
    ///
    /// A small result set here is what turns a free-text clarification into a
    /// multiple-choice one.
    pub fn known_values(&self, field: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .entities
            .iter()
            .filter_map(|e| e.field(field))
            .map(String::from)
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Names of entities of a kind that carry the given field, sorted
    pub fn names_with_field(&self, kind: EntityKind, field: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .entities_of_kind(kind)
            .filter(|e| e.field(field).is_some())
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Supplies the knowledge-graph context for a user
///
/// The capture pipeline consumes this read-only; implementations decide where
/// the knowledge actually lives.
pub trait ContextProvider: Send + Sync {
    /// Fetch the current context snapshot for a user
    fn get_context(&self, user: &str) -> Result<KnowledgeGraphContext>;
}

/// Provider that knows nothing about anyone
///
/// Useful for tests and for running the pipeline without a store: every
/// entity reference becomes a clarification instead of a lookup.
pub struct NullContextProvider;

impl ContextProvider for NullContextProvider {
    fn get_context(&self, user: &str) -> Result<KnowledgeGraphContext> {
        Ok(KnowledgeGraphContext::empty(user))
    }
}

/// The main entity store
pub struct EntityStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl EntityStore {
    /// Open or create an entity store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened entity store");
        Ok(Self { base_path })
    }

    fn doc_path(&self, user: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", sanitize_user(user)))
    }

    fn load_doc(&self, user: &str) -> Result<KnowledgeDocument> {
        let path = self.doc_path(user);
        if !path.exists() {
            return Ok(KnowledgeDocument::default());
        }
        let content = fs::read_to_string(&path).context(format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).context(format!("Malformed knowledge document: {}", path.display()))
    }

    fn save_doc(&self, user: &str, doc: &KnowledgeDocument) -> Result<()> {
        let path = self.doc_path(user);
        let content = serde_json::to_string_pretty(doc)?;
        fs::write(&path, content).context(format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Insert or update an entity for a user
    ///
    /// Entities are matched by kind + case-insensitive name; an update merges
    /// fields into the existing entity rather than replacing it.
    pub fn upsert(&self, user: &str, entity: Entity) -> Result<String> {
        let mut doc = self.load_doc(user)?;

        if let Some(existing) = doc
            .entities
            .iter_mut()
            .find(|e| e.kind == entity.kind && e.name.eq_ignore_ascii_case(&entity.name))
        {
            for (k, v) in entity.fields {
                existing.fields.insert(k, v);
            }
            let id = existing.id.clone();
            self.save_doc(user, &doc)?;
            info!(user, entity_id = %id, "Updated entity");
            return Ok(id);
        }

        let id = entity.id.clone();
        doc.entities.push(entity);
        self.save_doc(user, &doc)?;
        info!(user, entity_id = %id, "Added entity");
        Ok(id)
    }

    /// Remove an entity by name
    pub fn remove(&self, user: &str, name: &str) -> Result<bool> {
        let mut doc = self.load_doc(user)?;
        let before = doc.entities.len();
        doc.entities.retain(|e| !e.name.eq_ignore_ascii_case(name));
        let removed = doc.entities.len() < before;
        if removed {
            self.save_doc(user, &doc)?;
            info!(user, name, "Removed entity");
        }
        Ok(removed)
    }

    /// List all entities for a user
    pub fn list(&self, user: &str) -> Result<Vec<Entity>> {
        Ok(self.load_doc(user)?.entities)
    }

    /// List all users with a knowledge document
    pub fn list_users(&self) -> Result<Vec<String>> {
        let mut users = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                users.push(stem.to_string());
            }
        }
        users.sort();
        Ok(users)
    }
}

impl ContextProvider for EntityStore {
    fn get_context(&self, user: &str) -> Result<KnowledgeGraphContext> {
        let doc = self.load_doc(user)?;
        Ok(KnowledgeGraphContext {
            user: user.to_string(),
            entities: doc.entities,
        })
    }
}

/// Keep user-supplied identifiers filesystem-safe
fn sanitize_user(user: &str) -> String {
    user.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
