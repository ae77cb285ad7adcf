//! Services the converter consumes but does not own.
//!
//! Storage of entities and records, rendering of a guest at a view mode, the
//! field/type allow-lists and identity checks all live behind these traits. Every
//! operation receives them bundled in an [`EmbedContext`] built for that call, so no
//! externally sourced data is remembered between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::record::{EntityId, Identity, RecordId};

/// A content entity: a host, a guest, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// `None` until the entity has been saved for the first time.
    #[serde(default)]
    pub id: Option<EntityId>,
    pub bundle: String,
    /// Field name to field values (fields may be multi-valued).
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl Entity {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            id: None,
            bundle: bundle.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.fields.insert(name.into(), values);
        self
    }

    pub fn field_values(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// An embed record as the storage layer holds it.
///
/// Values stay strings so that loading can tell an empty value from a malformed one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredRecord {
    pub host_id: String,
    pub guest_id: String,
    pub host_field: String,
    pub field_value_index: String,
    pub view_mode: String,
    pub location: String,
    pub local_content: String,
}

pub trait EntityStore {
    fn load(&self, id: EntityId) -> Result<Option<Entity>>;

    /// The entity as last persisted, ignoring any unsaved changes.
    fn load_unchanged(&self, id: EntityId) -> Result<Option<Entity>>;

    /// Persist `entity`, assigning an id if it has none. Returns the id.
    fn save(&self, entity: &Entity) -> Result<EntityId>;

    fn exists(&self, id: EntityId) -> Result<bool> {
        Ok(self.load(id)?.is_some())
    }
}

pub trait RecordStore {
    fn load(&self, id: RecordId) -> Result<Option<StoredRecord>>;
    fn insert(&self, record: &StoredRecord) -> Result<RecordId>;
    fn delete(&self, id: RecordId) -> Result<bool>;
}

pub trait ViewRenderer {
    /// Markup for `guest` rendered at `view_mode`.
    fn render(&self, guest: EntityId, view_mode: &str) -> Result<String>;
}

/// Field definitions of a bundle, as `(field name, field storage type)` pairs.
pub trait FieldCatalog {
    fn field_definitions(&self, bundle: &str) -> Vec<(String, String)>;
}

pub trait Metadata {
    fn is_eligible_field(&self, name: &str) -> bool;
    fn is_valid_view_mode(&self, name: &str) -> bool;
    fn is_known_embed_type(&self, name: &str) -> bool;
    /// Recognised embed type names, lowercase.
    fn embed_type_names(&self) -> Vec<String>;
    fn list_eligible_fields(&self, bundle: &str) -> Vec<String>;
}

pub trait IdentityService {
    /// Lookup failures are errors, not invalid identities.
    fn is_valid_identity(&self, value: &Identity) -> Result<bool>;
    fn new_uuid(&self) -> Uuid;
}

pub trait DiagnosticsSink {
    fn report_unknown_type(&self, name: &str);
    fn log_error(&self, message: &str);
}

/// Per-call bundle of collaborators.
#[derive(Clone, Copy)]
pub struct EmbedContext<'a> {
    pub entities: &'a dyn EntityStore,
    pub records: &'a dyn RecordStore,
    pub renderer: &'a dyn ViewRenderer,
    pub metadata: &'a dyn Metadata,
    pub identities: &'a dyn IdentityService,
    pub diagnostics: &'a dyn DiagnosticsSink,
}
