//! Allow-lists and identity checks backed by configuration and the entity store.
//!
//! Both types borrow their sources and are meant to be built for one request; they
//! cache nothing.

use uuid::Uuid;

use crate::collaborators::{EntityStore, FieldCatalog, IdentityService, Metadata};
use crate::config::Config;
use crate::error::Result;
use crate::record::Identity;

pub struct ShardMetadata<'a> {
    config: &'a Config,
    catalog: &'a dyn FieldCatalog,
}

impl<'a> ShardMetadata<'a> {
    pub fn new(config: &'a Config, catalog: &'a dyn FieldCatalog) -> Self {
        Self { config, catalog }
    }
}

impl Metadata for ShardMetadata<'_> {
    fn is_eligible_field(&self, name: &str) -> bool {
        self.config.fields.iter().any(|f| f == name)
    }

    fn is_valid_view_mode(&self, name: &str) -> bool {
        self.config.view_modes.iter().any(|m| m == name)
    }

    fn is_known_embed_type(&self, name: &str) -> bool {
        self.config
            .embed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }

    fn embed_type_names(&self) -> Vec<String> {
        self.config
            .embed_types
            .iter()
            .map(|t| t.to_lowercase())
            .collect()
    }

    fn list_eligible_fields(&self, bundle: &str) -> Vec<String> {
        if !self.config.content_types.iter().any(|b| b == bundle) {
            return Vec::new();
        }
        self.catalog
            .field_definitions(bundle)
            .into_iter()
            .filter(|(name, field_type)| {
                self.is_eligible_field(name) && self.config.field_types.contains(field_type)
            })
            .map(|(name, _)| name)
            .collect()
    }
}

/// Placeholders are always valid; real ids must name a stored entity.
pub struct StoreIdentities<'a> {
    entities: &'a dyn EntityStore,
}

impl<'a> StoreIdentities<'a> {
    pub fn new(entities: &'a dyn EntityStore) -> Self {
        Self { entities }
    }
}

impl IdentityService for StoreIdentities<'_> {
    fn is_valid_identity(&self, value: &Identity) -> Result<bool> {
        match value {
            Identity::Placeholder(_) => Ok(true),
            Identity::Id(0) => Ok(false),
            Identity::Id(id) => self.entities.exists(*id).inspect_err(|e| {
                log::error!("Could not look up entity {id}: {e}");
            }),
        }
    }

    fn new_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}
