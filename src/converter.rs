//! The three format transitions of an embed marker.
//!
//! ```text
//!            authoring_to_storage
//! Authoring ----------------------> Storage ----------------------> Display
//!           <----------------------         storage_to_display
//!            storage_to_authoring
//! ```
//!
//! Each transition parses one field value, drives a find, convert, mark loop over it and
//! serializes the result with every processed sentinel removed. Nothing is kept between
//! calls; the collaborators come in through the [`EmbedContext`].

use kuchiki::NodeRef;
use uuid::Uuid;

use crate::collaborators::EmbedContext;
use crate::config::Config;
use crate::error::{Result, ShardError};
use crate::markup::{self, Fragment};
use crate::merger;
use crate::placeholder::PendingRecord;
use crate::record::{EmbedRecord, Identity, RecordId};
use crate::scanner::{self, PendingMarkers, SourceLocator, TagScanner};
use crate::vocabulary::{
    CLASS_ATTRIBUTE, GUEST_ID_ATTRIBUTE, RECORD_ID_ATTRIBUTE, TYPE_ATTRIBUTE,
    VIEW_MODE_ATTRIBUTE, widget_class,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Authoring,
    Storage,
    Display,
}

/// One value of a host field: the target of an authoring to storage conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFieldValue {
    pub host: Identity,
    pub field: String,
    pub index: usize,
}

impl HostFieldValue {
    pub fn new(host: Identity, field: impl Into<String>, index: usize) -> Self {
        Self {
            host,
            field: field.into(),
            index,
        }
    }
}

/// What happened to one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOutcome {
    /// A record was stored under this id.
    Persisted(RecordId),
    /// The host has no identity yet; the record waits under this marker placeholder.
    Queued(Uuid),
    /// The stored record with this id was rendered into the marker.
    Rendered(RecordId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub markup: String,
    /// One entry per converted marker, in document order.
    pub outcomes: Vec<MarkerOutcome>,
    /// Records waiting for the host's identity, in document order.
    pub pending: Vec<PendingRecord>,
}

fn required_attribute(marker: &NodeRef, name: &str) -> Result<String> {
    markup::attribute(marker, name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ShardError::missing(format!("Element missing required {name} attribute")))
}

/// Parse a storage-format `data-shard-id`.
fn stored_record_id(marker: &NodeRef) -> Result<RecordId> {
    let value = required_attribute(marker, RECORD_ID_ATTRIBUTE)?;
    match value.parse::<Identity>()? {
        Identity::Id(id) => Ok(id),
        Identity::Placeholder(uuid) => Err(ShardError::bad_type(format!(
            "record id {uuid} is an unresolved placeholder"
        ))),
    }
}

pub struct Converter<'a> {
    ctx: EmbedContext<'a>,
    max_conversions: usize,
}

impl<'a> Converter<'a> {
    pub fn new(ctx: EmbedContext<'a>, max_conversions: usize) -> Self {
        Self {
            ctx,
            max_conversions,
        }
    }

    pub fn with_config(ctx: EmbedContext<'a>, config: &Config) -> Self {
        Self::new(ctx, config.max_conversions)
    }

    /// Run the transition from `from` to `to`. Only authoring to storage needs `target`.
    pub fn convert(
        &self,
        html: &str,
        from: Format,
        to: Format,
        target: Option<&HostFieldValue>,
    ) -> Result<Conversion> {
        match (from, to) {
            (Format::Authoring, Format::Storage) => {
                let target = target.ok_or_else(|| {
                    ShardError::missing("authoring to storage needs a host field value")
                })?;
                self.authoring_to_storage(html, target)
            }
            (Format::Storage, Format::Display) => self.storage_to_display(html),
            (Format::Storage, Format::Authoring) => self.storage_to_authoring(html),
            (from, to) => Err(ShardError::unexpected(format!(
                "no conversion from {from:?} to {to:?}"
            ))),
        }
    }

    /// Convert editor markup for storage with the field value it belongs to.
    ///
    /// Records are created outermost first, but stored innermost first: a record's local
    /// content is read once the markers nested in it have their final ids. For a
    /// placeholder host nothing is stored; the records come back in
    /// [`Conversion::pending`].
    pub fn authoring_to_storage(&self, html: &str, target: &HostFieldValue) -> Result<Conversion> {
        let fragment = Fragment::parse_fresh(html)?;
        let root = fragment.root();
        let scanner = TagScanner::from_context(&self.ctx);
        let locator = SourceLocator::new(html);
        let mut queue = PendingMarkers::new(&scanner, root, self.max_conversions);

        let mut converted: Vec<(NodeRef, EmbedRecord)> = Vec::new();
        while let Some(marker) = queue.next_marker()? {
            let record = self.read_authoring_marker(root, &marker, &locator, target)?;
            let embed_type = required_attribute(&marker, TYPE_ATTRIBUTE)?;

            markup::strip_attributes(&marker);
            markup::remove_children(&marker);
            markup::set_attribute(&marker, TYPE_ATTRIBUTE, embed_type);
            merger::insert_local_content(&marker, record.local_content())?;

            queue.complete(&marker)?;
            converted.push((marker, record));
        }
        scanner::strip_processed_markers(root);

        let mut outcomes = Vec::with_capacity(converted.len());
        let mut pending = Vec::new();
        for (marker, mut record) in converted.into_iter().rev() {
            record.set_local_content(merger::extract_local_content(&marker));
            match target.host {
                Identity::Id(_) => {
                    let id = record.persist_as_new(&self.ctx)?;
                    markup::set_attribute(&marker, RECORD_ID_ATTRIBUTE, id.to_string());
                    outcomes.push(MarkerOutcome::Persisted(id));
                }
                Identity::Placeholder(_) => {
                    let placeholder = self.ctx.identities.new_uuid();
                    markup::set_attribute(&marker, RECORD_ID_ATTRIBUTE, placeholder.to_string());
                    pending.push(PendingRecord::new(placeholder, record));
                    outcomes.push(MarkerOutcome::Queued(placeholder));
                }
            }
        }
        outcomes.reverse();
        pending.reverse();

        Ok(Conversion {
            markup: fragment.serialize(),
            outcomes,
            pending,
        })
    }

    fn read_authoring_marker(
        &self,
        root: &NodeRef,
        marker: &NodeRef,
        locator: &SourceLocator,
        target: &HostFieldValue,
    ) -> Result<EmbedRecord> {
        let guest = required_attribute(marker, GUEST_ID_ATTRIBUTE)?;
        let embed_type = required_attribute(marker, TYPE_ATTRIBUTE)?;
        let view_mode = required_attribute(marker, VIEW_MODE_ATTRIBUTE)?;
        let index = i64::try_from(target.index)
            .map_err(|_| ShardError::bad_type(format!("field value index {} too large", target.index)))?;
        let line = locator.line_of(root, marker);

        log::debug!("Converting {embed_type} marker for guest {guest} at line {line}");

        let mut record = EmbedRecord::new();
        record
            .set_embed_type(&embed_type, self.ctx.metadata)?
            .set_guest_id(guest.parse()?, self.ctx.identities)?
            .set_host_id(target.host, self.ctx.identities)?
            .set_host_field_name(&target.field, self.ctx.metadata)?
            .set_field_value_index(index)?
            .set_view_mode(&view_mode, self.ctx.metadata)?
            .set_source_location(line as i64)?
            .set_local_content(merger::extract_local_content(marker));
        Ok(record)
    }

    /// Render stored markup for readers. Markers keep their type and id.
    pub fn storage_to_display(&self, html: &str) -> Result<Conversion> {
        self.render_stored(html, |_, _| Ok(()))
    }

    /// Turn stored markup back into editor markup.
    pub fn storage_to_authoring(&self, html: &str) -> Result<Conversion> {
        self.render_stored(html, |marker, record| {
            let guest = record
                .guest_id()
                .ok_or_else(|| ShardError::missing("embed record has no guest id"))?;
            let view_mode = record
                .view_mode()
                .ok_or_else(|| ShardError::missing("embed record has no view mode"))?;
            let embed_type = required_attribute(marker, TYPE_ATTRIBUTE)?;

            markup::set_attribute(marker, GUEST_ID_ATTRIBUTE, guest.to_string());
            markup::set_attribute(marker, VIEW_MODE_ATTRIBUTE, view_mode);
            add_class(marker, &widget_class(&embed_type.to_lowercase()));
            markup::remove_attribute(marker, RECORD_ID_ATTRIBUTE);
            Ok(())
        })
    }

    /// Load, render and merge every stored marker, letting `decorate` adjust the marker
    /// before its children are replaced.
    fn render_stored<F>(&self, html: &str, decorate: F) -> Result<Conversion>
    where
        F: Fn(&NodeRef, &EmbedRecord) -> Result<()>,
    {
        let fragment = Fragment::parse_fresh(html)?;
        let root = fragment.root();
        let scanner = TagScanner::from_context(&self.ctx);
        let mut queue = PendingMarkers::new(&scanner, root, self.max_conversions);
        let mut outcomes = Vec::new();

        while let Some(marker) = queue.next_marker()? {
            let id = stored_record_id(&marker)?;
            let mut record = EmbedRecord::load_from_storage(id, &self.ctx)?;
            record.set_embed_type(&required_attribute(&marker, TYPE_ATTRIBUTE)?, self.ctx.metadata)?;

            let merged = self.render_merged(&record)?;
            decorate(&marker, &record)?;
            markup::replace_children(&marker, merged.root());

            queue.complete(&marker)?;
            outcomes.push(MarkerOutcome::Rendered(id));
            log::debug!("Rendered embed record {id}");
        }
        scanner::strip_processed_markers(root);

        Ok(Conversion {
            markup: fragment.serialize(),
            outcomes,
            pending: Vec::new(),
        })
    }

    fn render_merged(&self, record: &EmbedRecord) -> Result<Fragment> {
        let guest = match record.guest_id() {
            Some(Identity::Id(id)) => id,
            Some(Identity::Placeholder(uuid)) => {
                return Err(ShardError::bad_type(format!(
                    "guest {uuid} is a placeholder and cannot be rendered"
                )));
            }
            None => return Err(ShardError::missing("embed record has no guest id")),
        };
        let view_mode = record
            .view_mode()
            .ok_or_else(|| ShardError::missing("embed record has no view mode"))?;

        let rendered = self.ctx.renderer.render(guest, view_mode)?;
        merger::merge_into_rendered(&rendered, record.local_content())
    }
}

fn add_class(node: &NodeRef, class: &str) {
    if markup::has_class(node, class) {
        return;
    }
    let classes = match markup::attribute(node, CLASS_ATTRIBUTE) {
        Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
        _ => class.to_string(),
    };
    markup::set_attribute(node, CLASS_ATTRIBUTE, classes);
}
