//! Wire and merged representations of entity-type metadata

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One item of the paged `EntityTypes` catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityTypeRecord {
    /// Remote id
    #[serde(default)]
    pub id: Option<u64>,
    /// Type name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether custom fields can be added
    #[serde(default)]
    pub is_extendable: Option<bool>,
    /// Whether the type takes part in search
    #[serde(default)]
    pub is_searchable: Option<bool>,
}

/// Field exposed by an entity type in the `meta` feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaProperty {
    /// Field name
    pub name: String,
    /// Declared value type
    #[serde(default, rename = "Type")]
    pub value_type: Option<String>,
    /// Whether the field must be supplied on create
    #[serde(default)]
    pub is_required: bool,
}

/// Relation from one entity type to another in the `meta` feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaRelation {
    /// Relation name
    pub name: String,
    /// Related entity type
    #[serde(default, alias = "Type")]
    pub target: Option<String>,
}

/// Entry of the `meta` feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaEntry {
    /// Type name; filled from the map key when the feed is keyed by name
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the type can be created
    #[serde(default)]
    pub can_create: Option<bool>,
    /// Whether the type can be updated
    #[serde(default)]
    pub can_update: Option<bool>,
    /// Whether the type can be deleted
    #[serde(default)]
    pub can_delete: Option<bool>,
    /// Fields
    #[serde(default)]
    pub properties: Vec<MetaProperty>,
    /// Relations
    #[serde(default)]
    pub relations: Vec<MetaRelation>,
    /// Types this one nests under
    #[serde(default, alias = "Hierarchy")]
    pub parent_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MetaItems {
    Keyed(BTreeMap<String, MetaEntry>),
    Listed(Vec<MetaEntry>),
}

/// Decoded `meta` feed: `{ "Items": { "<Name>": {...} } }` or `{ "Items": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct MetaFeed {
    #[serde(rename = "Items")]
    items: MetaItems,
}

impl MetaFeed {
    /// Named entries; entries without a resolvable name are dropped
    #[must_use]
    pub fn into_entries(self) -> Vec<MetaEntry> {
        let entries: Vec<MetaEntry> = match self.items {
            MetaItems::Keyed(map) => map
                .into_iter()
                .map(|(key, mut entry)| {
                    if entry.name.as_deref().is_none_or(str::is_empty) {
                        entry.name = Some(key);
                    }
                    entry
                })
                .collect(),
            MetaItems::Listed(list) => list,
        };
        entries
            .into_iter()
            .filter(|e| e.name.as_deref().is_some_and(|n| !n.trim().is_empty()))
            .collect()
    }
}

/// Which source contributed to a merged entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    /// Paged `EntityTypes` catalog
    Primary,
    /// `meta` feed
    Secondary,
    /// Built-in system type table
    Static,
}

/// Merged view of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTypeDetail {
    /// Type name
    pub name: String,
    /// Contributing sources, in merge order
    pub sources: Vec<MetadataSource>,
    /// Remote id from the primary catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether custom fields can be added
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_extendable: Option<bool>,
    /// Whether the type takes part in search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_searchable: Option<bool>,
    /// Create permission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_create: Option<bool>,
    /// Update permission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_update: Option<bool>,
    /// Delete permission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_delete: Option<bool>,
    /// Fields
    pub properties: Vec<MetaProperty>,
    /// Relations
    pub relations: Vec<MetaRelation>,
    /// Parent types
    pub parent_types: Vec<String>,
}

impl EntityTypeDetail {
    pub(crate) fn named(name: impl Into<String>, source: MetadataSource) -> Self {
        Self {
            name: name.into(),
            sources: vec![source],
            id: None,
            description: None,
            is_extendable: None,
            is_searchable: None,
            can_create: None,
            can_update: None,
            can_delete: None,
            properties: Vec::new(),
            relations: Vec::new(),
            parent_types: Vec::new(),
        }
    }
}

/// Result of reconciling every metadata source
#[derive(Debug, Clone, Default, Serialize)]
pub struct HybridMetadata {
    /// Merged entries keyed by type name
    pub entries: BTreeMap<String, EntityTypeDetail>,
    /// Items returned by the primary catalog
    pub primary_count: usize,
    /// Entries decoded from the secondary feed
    pub secondary_count: usize,
    /// Whether the secondary feed was fetched and decoded
    pub secondary_available: bool,
    /// Degradations encountered while loading
    pub warnings: Vec<String>,
}

impl HybridMetadata {
    /// Sorted, de-duplicated type names
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Whether any remote source contributed
    #[must_use]
    pub fn has_remote_data(&self) -> bool {
        self.primary_count > 0 || self.secondary_count > 0
    }
}
