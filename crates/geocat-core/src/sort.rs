//! Sort resolution: turns `sortby` into a strict total order.
//!
//! Every resolved [`SortOrder`] ends with the unique identifier, so no two
//! distinct records ever compare equal. Keyset pagination depends on this:
//! a boundary row must identify exactly one position in the scan.
//!
//! Missing values sort after every present value in ascending order and
//! before them in descending order, the way relational stores order NULLs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

use crate::error::SearchError;
use crate::registry::{FieldDescriptor, FieldRegistry};
use crate::types::{FieldValue, Item, SortDirection};

/// One `sortby` entry as the client wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A resolved ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: FieldDescriptor,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortOrder {
    keys: Vec<SortKey>,
}

impl SortOrder {
    /// `datetime desc, id asc`.
    pub fn default_for(registry: &FieldRegistry) -> Self {
        Self {
            keys: vec![
                SortKey {
                    field: registry.temporal_field().clone(),
                    direction: SortDirection::Desc,
                },
                id_key(registry),
            ],
        }
    }

    /// `id asc` alone, used when a request names its ids explicitly.
    pub fn by_id(registry: &FieldRegistry) -> Self {
        Self {
            keys: vec![id_key(registry)],
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Same keys, every direction flipped.
    pub fn reversed(&self) -> SortOrder {
        SortOrder {
            keys: self
                .keys
                .iter()
                .map(|k| SortKey {
                    field: k.field.clone(),
                    direction: k.direction.reversed(),
                })
                .collect(),
        }
    }

    /// Canonical text of the order, e.g. `datetime:desc|id:asc`.
    pub fn canonical(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{}:{}", k.field.name, k.direction))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Short stable hash of [`canonical`](Self::canonical).
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.canonical().as_bytes());
        hex::encode(&digest[..8])
    }

    /// The ordering tuple of `item`.
    pub fn key_values(&self, item: &Item) -> Vec<Option<FieldValue>> {
        self.keys.iter().map(|k| item.field_value(&k.field)).collect()
    }

    /// Lexicographic comparison of two ordering tuples under this order.
    pub fn compare_values(&self, a: &[Option<FieldValue>], b: &[Option<FieldValue>]) -> Ordering {
        self.keys
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(key, (x, y))| compare_key(key.direction, x.as_ref(), y.as_ref()))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        self.compare_values(&self.key_values(a), &self.key_values(b))
    }
}

/// Compare one key's values, nulls last in ascending order.
pub fn compare_key(direction: SortDirection, a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    let ascending = match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    };
    match direction {
        SortDirection::Asc => ascending,
        SortDirection::Desc => ascending.reverse(),
    }
}

fn id_key(registry: &FieldRegistry) -> SortKey {
    SortKey {
        field: registry.id_field().clone(),
        direction: SortDirection::Asc,
    }
}

/// Resolve `sortby` against the registry.
///
/// An empty list means the default order. Otherwise the `id asc` tiebreak is
/// appended unless the list already ends with `id` (in either direction).
/// Keys after an explicit `id` can never decide a comparison and are dropped.
pub fn resolve_sort(sortby: &[SortBy], registry: &FieldRegistry) -> Result<SortOrder, SearchError> {
    if sortby.is_empty() {
        return Ok(SortOrder::default_for(registry));
    }

    let mut keys: Vec<SortKey> = Vec::with_capacity(sortby.len() + 1);
    for entry in sortby {
        let field = registry.resolve(&entry.field)?;
        if keys.iter().any(|k| k.field == *field) {
            return Err(SearchError::DuplicateSortField {
                field: entry.field.clone(),
            });
        }
        keys.push(SortKey {
            field: field.clone(),
            direction: entry.direction,
        });
    }

    match keys.iter().position(|k| k.field == *registry.id_field()) {
        Some(at) => keys.truncate(at + 1),
        None => keys.push(id_key(registry)),
    }
    Ok(SortOrder { keys })
}
