//! An in-memory site: entities, embed records, canned renderings and field definitions.
//!
//! `MemorySite` implements every storage-side collaborator and can be read from and
//! written to a JSON file, which is what the command-line tool works against.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collaborators::{
    DiagnosticsSink, EmbedContext, Entity, EntityStore, FieldCatalog, IdentityService, Metadata,
    RecordStore, StoredRecord, ViewRenderer,
};
use crate::error::{Result, ShardError};
use crate::record::{EntityId, RecordId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteData {
    pub entities: BTreeMap<EntityId, Entity>,
    pub records: BTreeMap<RecordId, StoredRecord>,
    /// Guest id to view mode to rendered markup.
    pub renders: BTreeMap<EntityId, BTreeMap<String, String>>,
    /// Bundle to field name to field storage type.
    pub fields: BTreeMap<String, BTreeMap<String, String>>,
}

fn next_key<V>(map: &BTreeMap<u64, V>) -> u64 {
    map.keys().next_back().map_or(1, |last| last + 1)
}

#[derive(Debug, Default)]
pub struct MemorySite {
    data: RefCell<SiteData>,
}

impl MemorySite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: SiteData) -> Self {
        Self {
            data: RefCell::new(data),
        }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        log::debug!("Reading site from: {}", path.display());
        let text = fs::read_to_string(path)?;
        let data = serde_json::from_str(&text).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid site file {}: {e}", path.display()),
            )
        })?;
        Ok(Self::from_data(data))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let text = serde_json::to_string_pretty(&*self.data.borrow()).map_err(io::Error::other)?;
        fs::write(path, text + "\n")?;
        log::info!("Wrote site to: {}", path.display());
        Ok(())
    }

    pub fn snapshot(&self) -> SiteData {
        self.data.borrow().clone()
    }

    /// Store `entity` under its own id, or a new one. Returns the id.
    pub fn insert_entity(&self, mut entity: Entity) -> EntityId {
        let mut data = self.data.borrow_mut();
        let id = entity.id.unwrap_or_else(|| next_key(&data.entities));
        entity.id = Some(id);
        data.entities.insert(id, entity);
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.data.borrow().entities.get(&id).cloned()
    }

    pub fn insert_record(&self, record: StoredRecord) -> RecordId {
        let mut data = self.data.borrow_mut();
        let id = next_key(&data.records);
        data.records.insert(id, record);
        id
    }

    pub fn record(&self, id: RecordId) -> Option<StoredRecord> {
        self.data.borrow().records.get(&id).cloned()
    }

    pub fn record_ids(&self) -> Vec<RecordId> {
        self.data.borrow().records.keys().copied().collect()
    }

    pub fn record_count(&self) -> usize {
        self.data.borrow().records.len()
    }

    pub fn set_render(&self, guest: EntityId, view_mode: &str, markup: impl Into<String>) {
        self.data
            .borrow_mut()
            .renders
            .entry(guest)
            .or_default()
            .insert(view_mode.to_string(), markup.into());
    }

    pub fn define_field(&self, bundle: &str, name: &str, field_type: &str) {
        self.data
            .borrow_mut()
            .fields
            .entry(bundle.to_string())
            .or_default()
            .insert(name.to_string(), field_type.to_string());
    }

    /// Bundle the site with the request-scoped collaborators it does not provide.
    pub fn context<'a>(
        &'a self,
        metadata: &'a dyn Metadata,
        identities: &'a dyn IdentityService,
        diagnostics: &'a dyn DiagnosticsSink,
    ) -> EmbedContext<'a> {
        EmbedContext {
            entities: self,
            records: self,
            renderer: self,
            metadata,
            identities,
            diagnostics,
        }
    }
}

impl EntityStore for MemorySite {
    fn load(&self, id: EntityId) -> Result<Option<Entity>> {
        Ok(self.entity(id))
    }

    // Nothing here holds unsaved changes, so the stored entity is the unchanged one.
    fn load_unchanged(&self, id: EntityId) -> Result<Option<Entity>> {
        Ok(self.entity(id))
    }

    fn save(&self, entity: &Entity) -> Result<EntityId> {
        let id = self.insert_entity(entity.clone());
        log::debug!("Saved entity {id}");
        Ok(id)
    }

    fn exists(&self, id: EntityId) -> Result<bool> {
        Ok(self.data.borrow().entities.contains_key(&id))
    }
}

impl RecordStore for MemorySite {
    fn load(&self, id: RecordId) -> Result<Option<StoredRecord>> {
        Ok(self.record(id))
    }

    fn insert(&self, record: &StoredRecord) -> Result<RecordId> {
        Ok(self.insert_record(record.clone()))
    }

    fn delete(&self, id: RecordId) -> Result<bool> {
        Ok(self.data.borrow_mut().records.remove(&id).is_some())
    }
}

impl ViewRenderer for MemorySite {
    fn render(&self, guest: EntityId, view_mode: &str) -> Result<String> {
        self.data
            .borrow()
            .renders
            .get(&guest)
            .and_then(|modes| modes.get(view_mode))
            .cloned()
            .ok_or_else(|| {
                ShardError::not_found(format!(
                    "no rendering of entity {guest} at view mode '{view_mode}'"
                ))
            })
    }
}

impl FieldCatalog for MemorySite {
    fn field_definitions(&self, bundle: &str) -> Vec<(String, String)> {
        self.data
            .borrow()
            .fields
            .get(bundle)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, field_type)| (name.clone(), field_type.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
