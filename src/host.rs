//! Saving a host entity.
//!
//! Every value of every eligible field is converted from authoring to storage format.
//! A conversion that fails with a field-scoped error leaves that value as the author
//! wrote it and produces a [`Diagnostic`]; its siblings carry on. Collaborator failures
//! abort the save.
//!
//! A host without an id is saved in two phases: [`prepare_host_save`] converts against a
//! placeholder identity and returns the waiting records, then [`finish_new_host`]
//! persists them once the entity has its real id. [`save_host`] runs both.

use crate::collaborators::{EmbedContext, Entity};
use crate::config::Config;
use crate::converter::{Converter, HostFieldValue};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::markup::{self, AttrValue, Fragment};
use crate::placeholder::{self, PendingRecord, PlaceholderMap};
use crate::record::{EntityId, Identity, RecordId};
use crate::vocabulary::RECORD_ID_ATTRIBUTE;

/// An entity whose field values have been converted but which is not saved yet.
#[derive(Debug, Clone)]
pub struct PreparedHost {
    pub entity: Entity,
    /// The entity's id, or the placeholder standing in for it.
    pub host: Identity,
    pub pending: Vec<PendingRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Records of the previous revision that were deleted.
    pub erased: Vec<RecordId>,
}

#[derive(Debug, Clone)]
pub struct SavedHost {
    pub entity: Entity,
    pub id: EntityId,
    pub diagnostics: Vec<Diagnostic>,
    pub erased: Vec<RecordId>,
    pub placeholders: PlaceholderMap,
}

/// Numeric record ids referenced by stored markup.
pub fn stored_record_ids(html: &str) -> Result<Vec<RecordId>> {
    let fragment = Fragment::parse_fresh(html)?;
    Ok(
        markup::find_elements_by_attribute(fragment.root(), RECORD_ID_ATTRIBUTE, AttrValue::Any)
            .iter()
            .filter_map(|marker| markup::attribute(marker, RECORD_ID_ATTRIBUTE))
            .filter_map(|value| value.trim().parse::<RecordId>().ok())
            .collect(),
    )
}

pub fn prepare_host_save(
    entity: &Entity,
    ctx: &EmbedContext<'_>,
    config: &Config,
) -> Result<PreparedHost> {
    let host = match entity.id {
        Some(id) => Identity::Id(id),
        None => placeholder::new_placeholder(ctx.identities),
    };
    let original = match entity.id {
        Some(id) => ctx.entities.load_unchanged(id)?,
        None => None,
    };
    let converter = Converter::with_config(*ctx, config);

    let mut prepared = PreparedHost {
        entity: entity.clone(),
        host,
        pending: Vec::new(),
        diagnostics: Vec::new(),
        erased: Vec::new(),
    };

    for field in ctx.metadata.list_eligible_fields(&entity.bundle) {
        let values = entity.field_values(&field);
        let mut converted = Vec::new();

        for (index, value) in values.iter().enumerate() {
            let target = HostFieldValue::new(host, field.as_str(), index);
            match converter.authoring_to_storage(value, &target) {
                Ok(conversion) => {
                    if let Some(slot) = prepared
                        .entity
                        .fields
                        .get_mut(&field)
                        .and_then(|values| values.get_mut(index))
                    {
                        *slot = conversion.markup;
                    }
                    prepared.pending.extend(conversion.pending);
                    converted.push(index);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let message = format!("Could not convert embeds in {field}[{index}]: {e}");
                    ctx.diagnostics.log_error(&message);
                    prepared
                        .diagnostics
                        .push(Diagnostic::error(e.code(), message).for_field_value(&field, index));
                }
            }
        }

        if let Some(original) = &original {
            let erased = erase_stale_records(original, &field, &converted, values.len(), ctx)?;
            prepared.erased.extend(erased);
        }
    }

    Ok(prepared)
}

/// Delete the records referenced by the previous revision of `field`, for every value
/// that was converted again and every value that no longer exists.
fn erase_stale_records(
    original: &Entity,
    field: &str,
    converted: &[usize],
    new_len: usize,
    ctx: &EmbedContext<'_>,
) -> Result<Vec<RecordId>> {
    let mut erased = Vec::new();
    for (index, value) in original.field_values(field).iter().enumerate() {
        if index < new_len && !converted.contains(&index) {
            continue;
        }
        for id in stored_record_ids(value)? {
            if ctx.records.delete(id)? {
                log::debug!("Erased stale embed record {id} from {field}[{index}]");
                erased.push(id);
            }
        }
    }
    Ok(erased)
}

/// Second phase for a new host: persist the waiting records under `real_id`, swap the
/// placeholders in every field value for record ids and save the entity again.
pub fn finish_new_host(
    entity: &mut Entity,
    pending: Vec<PendingRecord>,
    real_id: EntityId,
    ctx: &EmbedContext<'_>,
) -> Result<PlaceholderMap> {
    let map = placeholder::resolve_placeholders(pending, real_id, ctx)?;
    entity.id = Some(real_id);
    for values in entity.fields.values_mut() {
        for value in values.iter_mut() {
            *value = map.rewrite(value)?;
        }
    }
    ctx.entities.save(entity)?;
    log::info!("Resolved {} embed placeholders for entity {real_id}", map.len());
    Ok(map)
}

/// Convert, save and, for a new host, finish the save.
pub fn save_host(entity: &Entity, ctx: &EmbedContext<'_>, config: &Config) -> Result<SavedHost> {
    let PreparedHost {
        mut entity,
        host,
        pending,
        diagnostics,
        erased,
    } = prepare_host_save(entity, ctx, config)?;

    let id = ctx.entities.save(&entity)?;
    entity.id = Some(id);

    let placeholders = if host.is_placeholder() && !pending.is_empty() {
        finish_new_host(&mut entity, pending, id, ctx)?
    } else {
        PlaceholderMap::new()
    };

    Ok(SavedHost {
        entity,
        id,
        diagnostics,
        erased,
        placeholders,
    })
}
