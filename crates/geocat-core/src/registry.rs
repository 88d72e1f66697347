//! Field registry: the set of names a request may filter or sort on.
//!
//! Three core fields are always present: the unique identifier `id`, the
//! owning `collection`, and the temporal field `datetime`. Item properties
//! that are queryable out of the box live in a compile-time table; a
//! deployment can register more through configuration. Once built, the
//! registry is shared read-only across requests.

use phf::phf_map;
use std::collections::BTreeMap;

use crate::error::SearchError;
use crate::types::FieldType;

/// Logical name of the unique identifier field.
pub const ID_FIELD: &str = "id";
/// Logical name of the collection field.
pub const COLLECTION_FIELD: &str = "collection";
/// Logical name of the temporal field.
pub const DATETIME_FIELD: &str = "datetime";

/// Built-in item properties, keyed by property name. Their storage path is
/// `properties.<name>`.
static BUILTIN_QUERYABLES: phf::Map<&'static str, FieldType> = phf_map! {
    "orientation" => FieldType::String,
    "gsd" => FieldType::Float,
    "height" => FieldType::Integer,
    "width" => FieldType::Integer,
    "proj:epsg" => FieldType::Integer,
    "cog:minzoom" => FieldType::Integer,
    "cog:maxzoom" => FieldType::Integer,
    "cog:dtype" => FieldType::String,
    "eo:cloud_cover" => FieldType::Float,
    "eo:snow_cover" => FieldType::Float,
    "aidash:client" => FieldType::String,
    "aidash:segment_id" => FieldType::Integer,
    "aidash:feeder_id" => FieldType::String,
};

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Name used in `query` and `sortby`.
    pub name: String,
    /// Dotted path of the field inside a record (`properties.gsd`).
    pub path: String,
    pub ty: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ty,
        }
    }

    /// Descriptor for an item property stored under `properties.<name>`.
    pub fn property(name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        let path = format!("properties.{name}");
        Self { name, path, ty }
    }
}

#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: BTreeMap<String, FieldDescriptor>,
    id: FieldDescriptor,
    temporal: FieldDescriptor,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FieldRegistry {
    /// Core fields plus the built-in queryable properties.
    pub fn builtin() -> Self {
        let id = FieldDescriptor::new(ID_FIELD, "id", FieldType::String);
        let temporal = FieldDescriptor::property(DATETIME_FIELD, FieldType::Timestamp);
        let collection = FieldDescriptor::new(COLLECTION_FIELD, "collection", FieldType::String);

        let mut fields = BTreeMap::new();
        for (name, ty) in BUILTIN_QUERYABLES.entries() {
            fields.insert(name.to_string(), FieldDescriptor::property(*name, *ty));
        }
        for core in [&id, &temporal, &collection] {
            fields.insert(core.name.clone(), core.clone());
        }

        Self {
            fields,
            id,
            temporal,
        }
    }

    /// `true` for `id`, `collection` and `datetime`, which cannot be redefined.
    pub fn is_core_field(name: &str) -> bool {
        matches!(name, ID_FIELD | COLLECTION_FIELD | DATETIME_FIELD)
    }

    /// Add or replace a queryable. Core fields are left untouched and the
    /// call returns `false`.
    pub fn register(&mut self, descriptor: FieldDescriptor) -> bool {
        if Self::is_core_field(&descriptor.name) {
            return false;
        }
        self.fields.insert(descriptor.name.clone(), descriptor);
        true
    }

    /// Resolve a logical name or a storage path (`properties.gsd` → `gsd`).
    pub fn resolve(&self, name: &str) -> Result<&FieldDescriptor, SearchError> {
        self.fields
            .get(name)
            .or_else(|| self.fields.values().find(|f| f.path == name))
            .ok_or_else(|| SearchError::UnknownField {
                field: name.to_string(),
            })
    }

    pub fn id_field(&self) -> &FieldDescriptor {
        &self.id
    }

    pub fn temporal_field(&self) -> &FieldDescriptor {
        &self.temporal
    }

    /// All registered fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
