//! Two-phase completion for hosts that do not have an identity yet.
//!
//! While such a host is converted, each marker carries its own placeholder UUID in
//! `data-shard-id` and its record waits in a [`PendingRecord`]. Once the host has been
//! saved, [`resolve_placeholders`] persists the waiting records with the real host id
//! and returns a [`PlaceholderMap`] used to rewrite the stored markup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborators::{EmbedContext, IdentityService};
use crate::error::Result;
use crate::markup::{self, AttrValue, Fragment};
use crate::record::{EmbedRecord, EntityId, Identity, RecordId};
use crate::vocabulary::RECORD_ID_ATTRIBUTE;

/// A fresh placeholder identity for a host that has not been saved.
pub fn new_placeholder(identities: &dyn IdentityService) -> Identity {
    Identity::Placeholder(identities.new_uuid())
}

/// A record waiting for its host's real identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    /// The value of the marker's `data-shard-id` until the record is persisted.
    pub marker_placeholder: Uuid,
    pub record: EmbedRecord,
}

impl PendingRecord {
    pub fn new(marker_placeholder: Uuid, record: EmbedRecord) -> Self {
        Self {
            marker_placeholder,
            record,
        }
    }
}

/// Marker placeholders and the record ids that replace them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    ids: HashMap<Uuid, RecordId>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placeholder: Uuid, id: RecordId) {
        self.ids.insert(placeholder, id);
    }

    pub fn get(&self, placeholder: &Uuid) -> Option<RecordId> {
        self.ids.get(placeholder).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &RecordId)> {
        self.ids.iter()
    }

    /// Replace every mapped placeholder in a `data-shard-id` with its record id.
    ///
    /// Markup that mentions none of the placeholders is returned as is.
    pub fn rewrite(&self, html: &str) -> Result<String> {
        if !self.ids.keys().any(|uuid| html.contains(&uuid.to_string())) {
            return Ok(html.to_string());
        }

        let fragment = Fragment::parse_fresh(html)?;
        for marker in markup::find_elements_by_attribute(fragment.root(), RECORD_ID_ATTRIBUTE, AttrValue::Any) {
            let Some(value) = markup::attribute(&marker, RECORD_ID_ATTRIBUTE) else {
                continue;
            };
            let Ok(uuid) = Uuid::parse_str(value.trim()) else {
                continue;
            };
            match self.get(&uuid) {
                Some(id) => markup::set_attribute(&marker, RECORD_ID_ATTRIBUTE, id.to_string()),
                None => log::warn!("No record id for placeholder {uuid}"),
            }
        }
        Ok(fragment.serialize())
    }
}

/// Persist `pending` with `real_host` as their host.
///
/// Records are persisted last-created first, so a record whose local content holds a
/// nested marker is stored after that marker's placeholder has been replaced.
pub fn resolve_placeholders(
    pending: Vec<PendingRecord>,
    real_host: EntityId,
    ctx: &EmbedContext<'_>,
) -> Result<PlaceholderMap> {
    let mut map = PlaceholderMap::new();
    for PendingRecord {
        marker_placeholder,
        mut record,
    } in pending.into_iter().rev()
    {
        let local_content = map.rewrite(record.local_content())?;
        record
            .set_local_content(local_content)
            .set_host_id(Identity::Id(real_host), ctx.identities)?;
        let id = record.persist_as_new(ctx)?;
        log::debug!("Placeholder {marker_placeholder} resolved to record {id}");
        map.insert(marker_placeholder, id);
    }
    Ok(map)
}
