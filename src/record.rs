//! The embed record: one embedding occurrence of a guest inside a host field value.
//!
//! Setters validate on the spot and fail with a typed error; nothing is coerced. Values
//! that are checked against collaborator-supplied allow-lists (identities, field names,
//! view modes, embed types) take the collaborator as an argument, so no validity data is
//! kept on the record or anywhere else between calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborators::{EmbedContext, IdentityService, Metadata, StoredRecord};
use crate::error::{Result, ShardError};

pub type EntityId = u64;
pub type RecordId = u64;

/// Identity of an entity: a real id, or a placeholder for a host not saved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    Id(EntityId),
    Placeholder(Uuid),
}

impl Identity {
    pub fn as_id(&self) -> Option<EntityId> {
        match self {
            Identity::Id(id) => Some(*id),
            Identity::Placeholder(_) => None,
        }
    }

    pub fn as_placeholder(&self) -> Option<Uuid> {
        match self {
            Identity::Placeholder(uuid) => Some(*uuid),
            Identity::Id(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Identity::Placeholder(_))
    }
}

impl From<EntityId> for Identity {
    fn from(id: EntityId) -> Self {
        Identity::Id(id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Id(id) => write!(f, "{id}"),
            Identity::Placeholder(uuid) => write!(f, "{uuid}"),
        }
    }
}

impl FromStr for Identity {
    type Err = ShardError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<EntityId>() {
            return Ok(Identity::Id(id));
        }
        Uuid::parse_str(s)
            .map(Identity::Placeholder)
            .map_err(|_| ShardError::bad_type(format!("'{s}' is neither a numeric id nor a UUID")))
    }
}

/// Parse a stored or attribute integer. Non-numeric input is [`ShardError::BadDataType`];
/// range checks are left to the setters.
pub(crate) fn parse_integer(value: &str, what: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ShardError::bad_type(format!("{what} '{value}' is not an integer")))
}

fn required<'v>(value: &'v str, what: &str) -> Result<&'v str> {
    if value.trim().is_empty() {
        Err(ShardError::missing(format!("embed record has no {what}")))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedRecord {
    record_id: Option<RecordId>,
    /// Read from the marker; not part of the stored record.
    embed_type: Option<String>,
    host_id: Option<Identity>,
    guest_id: Option<Identity>,
    host_field_name: Option<String>,
    field_value_index: Option<usize>,
    view_mode: Option<String>,
    source_location: Option<usize>,
    local_content: String,
}

impl EmbedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_record_id(value: i64) -> bool {
        value > 0
    }

    pub fn is_valid_delta(value: i64) -> bool {
        value >= 0
    }

    pub fn is_valid_location(value: i64) -> bool {
        value >= 0
    }

    pub fn is_valid_identity(value: &Identity, identities: &dyn IdentityService) -> Result<bool> {
        identities.is_valid_identity(value)
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn embed_type(&self) -> Option<&str> {
        self.embed_type.as_deref()
    }

    pub fn host_id(&self) -> Option<Identity> {
        self.host_id
    }

    pub fn guest_id(&self) -> Option<Identity> {
        self.guest_id
    }

    pub fn host_field_name(&self) -> Option<&str> {
        self.host_field_name.as_deref()
    }

    pub fn field_value_index(&self) -> Option<usize> {
        self.field_value_index
    }

    pub fn view_mode(&self) -> Option<&str> {
        self.view_mode.as_deref()
    }

    pub fn source_location(&self) -> Option<usize> {
        self.source_location
    }

    pub fn local_content(&self) -> &str {
        &self.local_content
    }

    pub fn set_record_id(&mut self, id: i64) -> Result<&mut Self> {
        if !Self::is_valid_record_id(id) {
            return Err(ShardError::unexpected(format!("invalid record id {id}")));
        }
        self.record_id = Some(id as RecordId);
        Ok(self)
    }

    pub fn set_embed_type(&mut self, name: &str, metadata: &dyn Metadata) -> Result<&mut Self> {
        if name.trim().is_empty() {
            return Err(ShardError::missing("embed type is empty"));
        }
        if !metadata.is_known_embed_type(name) {
            return Err(ShardError::unexpected(format!("unknown embed type '{name}'")));
        }
        self.embed_type = Some(name.to_string());
        Ok(self)
    }

    pub fn set_host_id(&mut self, host: Identity, identities: &dyn IdentityService) -> Result<&mut Self> {
        if !Self::is_valid_identity(&host, identities)? {
            return Err(ShardError::unexpected(format!("invalid host identity {host}")));
        }
        self.host_id = Some(host);
        Ok(self)
    }

    /// Guests must already exist, so a placeholder is never a valid guest.
    pub fn set_guest_id(&mut self, guest: Identity, identities: &dyn IdentityService) -> Result<&mut Self> {
        if let Identity::Placeholder(uuid) = guest {
            return Err(ShardError::unexpected(format!(
                "guest identity {uuid} is a placeholder"
            )));
        }
        if !Self::is_valid_identity(&guest, identities)? {
            return Err(ShardError::unexpected(format!("invalid guest identity {guest}")));
        }
        self.guest_id = Some(guest);
        Ok(self)
    }

    pub fn set_host_field_name(&mut self, name: &str, metadata: &dyn Metadata) -> Result<&mut Self> {
        if name.trim().is_empty() {
            return Err(ShardError::missing("host field name is empty"));
        }
        if !metadata.is_eligible_field(name) {
            return Err(ShardError::unexpected(format!(
                "field '{name}' is not eligible for embedding"
            )));
        }
        self.host_field_name = Some(name.to_string());
        Ok(self)
    }

    pub fn set_field_value_index(&mut self, index: i64) -> Result<&mut Self> {
        if !Self::is_valid_delta(index) {
            return Err(ShardError::unexpected(format!("invalid field value index {index}")));
        }
        self.field_value_index = Some(index as usize);
        Ok(self)
    }

    pub fn set_view_mode(&mut self, name: &str, metadata: &dyn Metadata) -> Result<&mut Self> {
        if name.trim().is_empty() {
            return Err(ShardError::missing("view mode is empty"));
        }
        if !metadata.is_valid_view_mode(name) {
            return Err(ShardError::unexpected(format!("invalid view mode '{name}'")));
        }
        self.view_mode = Some(name.to_string());
        Ok(self)
    }

    pub fn set_source_location(&mut self, location: i64) -> Result<&mut Self> {
        if !Self::is_valid_location(location) {
            return Err(ShardError::unexpected(format!("invalid source location {location}")));
        }
        self.source_location = Some(location as usize);
        Ok(self)
    }

    pub fn set_local_content(&mut self, markup: impl Into<String>) -> &mut Self {
        self.local_content = markup.into();
        self
    }

    /// Load record `id` from the record store.
    pub fn load_from_storage(id: RecordId, ctx: &EmbedContext<'_>) -> Result<Self> {
        let stored = ctx
            .records
            .load(id)?
            .ok_or_else(|| ShardError::not_found(format!("no embed record with id {id}")))?;

        let signed = i64::try_from(id)
            .map_err(|_| ShardError::bad_type(format!("record id {id} out of range")))?;

        let mut record = Self::new();
        record
            .set_record_id(signed)?
            .set_host_id(required(&stored.host_id, "host id")?.parse()?, ctx.identities)?
            .set_guest_id(required(&stored.guest_id, "guest id")?.parse()?, ctx.identities)?
            .set_host_field_name(required(&stored.host_field, "host field")?, ctx.metadata)?
            .set_field_value_index(parse_integer(
                required(&stored.field_value_index, "field value index")?,
                "field value index",
            )?)?
            .set_view_mode(required(&stored.view_mode, "view mode")?, ctx.metadata)?
            .set_source_location(parse_integer(
                required(&stored.location, "source location")?,
                "source location",
            )?)?
            .set_local_content(stored.local_content);

        log::debug!("Loaded embed record {id}");
        Ok(record)
    }

    /// The stored form of this record. Every required field must be set.
    pub fn to_stored(&self) -> Result<StoredRecord> {
        fn need<T>(value: Option<T>, what: &str) -> Result<T> {
            value.ok_or_else(|| ShardError::missing(format!("embed record has no {what}")))
        }

        Ok(StoredRecord {
            host_id: need(self.host_id, "host id")?.to_string(),
            guest_id: need(self.guest_id, "guest id")?.to_string(),
            host_field: need(self.host_field_name.as_deref(), "host field")?.to_string(),
            field_value_index: need(self.field_value_index, "field value index")?.to_string(),
            view_mode: need(self.view_mode.as_deref(), "view mode")?.to_string(),
            location: need(self.source_location, "source location")?.to_string(),
            local_content: self.local_content.clone(),
        })
    }

    /// Insert this record into the record store and return its new id.
    ///
    /// The host must have a real identity by now; records of placeholder hosts go
    /// through [`crate::placeholder::resolve_placeholders`] instead.
    pub fn persist_as_new(&mut self, ctx: &EmbedContext<'_>) -> Result<RecordId> {
        if let Some(id) = self.record_id {
            return Err(ShardError::unexpected(format!(
                "embed record already persisted as {id}"
            )));
        }
        let stored = self.to_stored()?;
        if let Some(Identity::Placeholder(uuid)) = self.host_id {
            return Err(ShardError::unexpected(format!(
                "cannot persist an embed record for placeholder host {uuid}"
            )));
        }
        if let Some(Identity::Placeholder(uuid)) = self.guest_id {
            return Err(ShardError::unexpected(format!(
                "cannot persist an embed record for placeholder guest {uuid}"
            )));
        }

        let id = ctx.records.insert(&stored)?;
        self.record_id = Some(id);
        log::debug!(
            "Persisted embed record {id}: guest {} in {}[{}] of host {}",
            stored.guest_id,
            stored.host_field,
            stored.field_value_index,
            stored.host_id
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Entity;
    use crate::config::Config;
    use crate::memory::MemorySite;
    use crate::memory::testing::with_context;

    fn site() -> MemorySite {
        let site = MemorySite::new();
        site.insert_entity(Entity::new("article").with_id(7));
        site.insert_entity(Entity::new("note").with_id(42));
        site
    }

    #[test]
    fn identity_parses_ids_and_uuids() {
        assert_eq!("42".parse::<Identity>().unwrap(), Identity::Id(42));
        let uuid = Uuid::new_v4();
        assert_eq!(
            uuid.to_string().parse::<Identity>().unwrap(),
            Identity::Placeholder(uuid)
        );
        assert!(matches!(
            "forty-two".parse::<Identity>(),
            Err(ShardError::BadDataType(_))
        ));
    }

    #[test]
    fn identity_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Identity::Id(3)).unwrap(), "3");
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&Identity::Placeholder(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
        assert_eq!(
            serde_json::from_str::<Identity>(&json).unwrap(),
            Identity::Placeholder(uuid)
        );
    }

    #[test]
    fn predicates() {
        assert!(EmbedRecord::is_valid_delta(0));
        assert!(!EmbedRecord::is_valid_delta(-1));
        assert!(EmbedRecord::is_valid_location(0));
        assert!(!EmbedRecord::is_valid_location(-3));
        assert!(EmbedRecord::is_valid_record_id(1));
        assert!(!EmbedRecord::is_valid_record_id(0));
    }

    #[test]
    fn setters_reject_invalid_values() {
        let site = site();
        with_context(&site, &Config::default(), |ctx, _| {
            let mut record = EmbedRecord::new();
            assert!(matches!(
                record.set_field_value_index(-1),
                Err(ShardError::UnexpectedValue(_))
            ));
            assert!(matches!(
                record.set_view_mode("poster", ctx.metadata),
                Err(ShardError::UnexpectedValue(_))
            ));
            assert!(matches!(
                record.set_view_mode("", ctx.metadata),
                Err(ShardError::MissingData(_))
            ));
            assert!(matches!(
                record.set_host_field_name("sidebar", ctx.metadata),
                Err(ShardError::UnexpectedValue(_))
            ));
            assert!(matches!(
                record.set_guest_id(Identity::Id(999), ctx.identities),
                Err(ShardError::UnexpectedValue(_))
            ));
            assert!(record.view_mode().is_none());
            assert!(record.guest_id().is_none());
        });
    }

    #[test]
    fn guest_cannot_be_a_placeholder() {
        let site = site();
        with_context(&site, &Config::default(), |ctx, _| {
            let mut record = EmbedRecord::new();
            assert!(matches!(
                record.set_guest_id(Identity::Placeholder(Uuid::new_v4()), ctx.identities),
                Err(ShardError::UnexpectedValue(_))
            ));
            assert!(record.guest_id().is_none());
            // Hosts may still be placeholders.
            assert!(
                record
                    .set_host_id(Identity::Placeholder(Uuid::new_v4()), ctx.identities)
                    .is_ok()
            );
        });
    }

    #[test]
    fn persist_then_load() {
        let site = site();
        with_context(&site, &Config::default(), |ctx, _| {
            let mut record = EmbedRecord::new();
            record
                .set_host_id(Identity::Id(7), ctx.identities)
                .unwrap()
                .set_guest_id(Identity::Id(42), ctx.identities)
                .unwrap()
                .set_host_field_name("body", ctx.metadata)
                .unwrap()
                .set_field_value_index(0)
                .unwrap()
                .set_view_mode("teaser", ctx.metadata)
                .unwrap()
                .set_source_location(3)
                .unwrap()
                .set_local_content("<p>mine</p>");

            let id = record.persist_as_new(ctx).unwrap();
            assert_eq!(record.record_id(), Some(id));

            let loaded = EmbedRecord::load_from_storage(id, ctx).unwrap();
            assert_eq!(loaded.host_id(), Some(Identity::Id(7)));
            assert_eq!(loaded.guest_id(), Some(Identity::Id(42)));
            assert_eq!(loaded.host_field_name(), Some("body"));
            assert_eq!(loaded.field_value_index(), Some(0));
            assert_eq!(loaded.view_mode(), Some("teaser"));
            assert_eq!(loaded.source_location(), Some(3));
            assert_eq!(loaded.local_content(), "<p>mine</p>");

            assert!(matches!(
                record.persist_as_new(ctx),
                Err(ShardError::UnexpectedValue(_))
            ));
        });
    }

    #[test]
    fn persist_requires_every_field() {
        let site = site();
        with_context(&site, &Config::default(), |ctx, _| {
            let mut record = EmbedRecord::new();
            record.set_guest_id(Identity::Id(42), ctx.identities).unwrap();
            assert!(matches!(
                record.persist_as_new(ctx),
                Err(ShardError::MissingData(_))
            ));
            assert_eq!(site.record_count(), 0);
        });
    }

    #[test]
    fn persist_refuses_placeholder_host() {
        let site = site();
        with_context(&site, &Config::default(), |ctx, _| {
            let mut record = EmbedRecord::new();
            record
                .set_host_id(Identity::Placeholder(Uuid::new_v4()), ctx.identities)
                .unwrap()
                .set_guest_id(Identity::Id(42), ctx.identities)
                .unwrap()
                .set_host_field_name("body", ctx.metadata)
                .unwrap()
                .set_field_value_index(0)
                .unwrap()
                .set_view_mode("full", ctx.metadata)
                .unwrap()
                .set_source_location(1)
                .unwrap();
            assert!(matches!(
                record.persist_as_new(ctx),
                Err(ShardError::UnexpectedValue(_))
            ));
        });
    }

    #[test]
    fn load_distinguishes_missing_from_malformed() {
        let site = site();
        let complete = StoredRecord {
            host_id: "7".into(),
            guest_id: "42".into(),
            host_field: "body".into(),
            field_value_index: "0".into(),
            view_mode: "full".into(),
            location: "1".into(),
            local_content: String::new(),
        };
        let empty_view = site.insert_record(StoredRecord {
            view_mode: String::new(),
            ..complete.clone()
        });
        let bad_index = site.insert_record(StoredRecord {
            field_value_index: "first".into(),
            ..complete.clone()
        });
        let negative = site.insert_record(StoredRecord {
            field_value_index: "-2".into(),
            ..complete
        });

        with_context(&site, &Config::default(), |ctx, _| {
            assert!(matches!(
                EmbedRecord::load_from_storage(empty_view, ctx),
                Err(ShardError::MissingData(_))
            ));
            assert!(matches!(
                EmbedRecord::load_from_storage(bad_index, ctx),
                Err(ShardError::BadDataType(_))
            ));
            assert!(matches!(
                EmbedRecord::load_from_storage(negative, ctx),
                Err(ShardError::UnexpectedValue(_))
            ));
            assert!(matches!(
                EmbedRecord::load_from_storage(9999, ctx),
                Err(ShardError::NotFound(_))
            ));
        });
    }

    #[test]
    fn record_serializes_for_transfer() {
        let site = site();
        with_context(&site, &Config::default(), |ctx, _| {
            let mut record = EmbedRecord::new();
            record
                .set_guest_id(Identity::Id(42), ctx.identities)
                .unwrap()
                .set_view_mode("full", ctx.metadata)
                .unwrap();
            let json = serde_json::to_string(&record).unwrap();
            let back: EmbedRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(back, record);
        });
    }
}
