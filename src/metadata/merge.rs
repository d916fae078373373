//! Reconciliation of primary, secondary and static metadata

use std::collections::BTreeMap;

use super::models::{EntityTypeDetail, EntityTypeRecord, MetaEntry, MetadataSource};
use crate::entity::EntityTypeDescriptor;

/// Merge the three sources into one entry per type name.
///
/// Primary records come first; secondary entries enrich a matching primary
/// entry or are added on their own; static descriptors fill in only names
/// neither remote source reported.
#[must_use]
pub fn merge(
    primary: &[EntityTypeRecord],
    secondary: &[MetaEntry],
    statics: &[EntityTypeDescriptor],
) -> BTreeMap<String, EntityTypeDetail> {
    let mut merged = BTreeMap::new();

    for record in primary {
        let name = record.name.trim();
        if name.is_empty() {
            continue;
        }
        let detail = merged
            .entry(name.to_string())
            .or_insert_with(|| EntityTypeDetail::named(name, MetadataSource::Primary));
        detail.id = detail.id.or(record.id);
        detail.description = detail.description.take().or_else(|| record.description.clone());
        detail.is_extendable = detail.is_extendable.or(record.is_extendable);
        detail.is_searchable = detail.is_searchable.or(record.is_searchable);
    }

    for entry in secondary {
        let Some(name) = entry.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        let detail = merged
            .entry(name.to_string())
            .or_insert_with(|| EntityTypeDetail::named(name, MetadataSource::Secondary));
        enrich(detail, entry);
    }

    for descriptor in statics {
        merged.entry(descriptor.name.clone()).or_insert_with(|| {
            let mut detail = EntityTypeDetail::named(&descriptor.name, MetadataSource::Static);
            detail.parent_types.clone_from(&descriptor.parent_types);
            detail
        });
    }

    merged
}

fn enrich(detail: &mut EntityTypeDetail, entry: &MetaEntry) {
    if !detail.sources.contains(&MetadataSource::Secondary) {
        detail.sources.push(MetadataSource::Secondary);
    }
    if detail.description.as_deref().is_none_or(str::is_empty) {
        detail.description.clone_from(&entry.description);
    }
    detail.can_create = entry.can_create.or(detail.can_create);
    detail.can_update = entry.can_update.or(detail.can_update);
    detail.can_delete = entry.can_delete.or(detail.can_delete);
    if !entry.properties.is_empty() {
        detail.properties.clone_from(&entry.properties);
    }
    if !entry.relations.is_empty() {
        detail.relations.clone_from(&entry.relations);
    }
    if !entry.parent_types.is_empty() {
        detail.parent_types.clone_from(&entry.parent_types);
    }
}
