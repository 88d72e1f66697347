//! Core types shared by every stage of the search pipeline.
//!
//! [`Item`] is the catalog record as the store hands it back. [`FieldType`]
//! and [`FieldValue`] are the typed view of a single field used for
//! predicates, orderings and pagination boundaries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::registry::FieldDescriptor;

fn default_feature_type() -> String {
    "Feature".to_string()
}

fn default_stac_version() -> String {
    "1.0.0".to_string()
}

/// A catalog record: a GeoJSON feature with a collection, a datetime and an
/// open set of properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(rename = "type", default = "default_feature_type")]
    pub kind: String,
    #[serde(default = "default_stac_version")]
    pub stac_version: String,
    pub collection: String,
    pub geometry: geojson::Geometry,
    /// `[minx, miny, maxx, maxy]`, or the 3D form with six values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(default)]
    pub assets: Map<String, Value>,
}

impl Item {
    /// Typed value of `field` on this item, or `None` when the item does not
    /// carry it (or carries something that does not fit the field's type).
    pub fn field_value(&self, field: &FieldDescriptor) -> Option<FieldValue> {
        match field.path.as_str() {
            "id" => Some(FieldValue::String(self.id.clone())),
            "collection" => Some(FieldValue::String(self.collection.clone())),
            path => {
                let key = path.strip_prefix("properties.")?;
                FieldValue::from_json(self.properties.get(key)?, field.ty)
            }
        }
    }

    /// The geometry as a `geo` shape, if it converts.
    pub fn shape(&self) -> Option<geo_types::Geometry<f64>> {
        geo_types::Geometry::<f64>::try_from(self.geometry.clone()).ok()
    }

    /// 2D bounds: the declared `bbox` when present, otherwise the bounding
    /// rectangle of the geometry.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        match self.bbox.as_deref() {
            Some([minx, miny, maxx, maxy]) => Some([*minx, *miny, *maxx, *maxy]),
            Some([minx, miny, _, maxx, maxy, _]) => Some([*minx, *miny, *maxx, *maxy]),
            _ => {
                use geo::BoundingRect;
                let rect = self.shape()?.bounding_rect()?;
                Some([rect.min().x, rect.min().y, rect.max().x, rect.max().y])
            }
        }
    }
}

fn default_collection_type() -> String {
    "Collection".to_string()
}

/// A collection record. Only the fields the API reads are typed; the rest
/// (`extent`, `keywords`, `providers`, ...) pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(rename = "type", default = "default_collection_type")]
    pub kind: String,
    #[serde(default = "default_stac_version")]
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Collection {
    /// A collection known only by its id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: default_collection_type(),
            stac_version: default_stac_version(),
            title: None,
            description: String::new(),
            links: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Primitive type of a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    /// RFC 3339 instant, stored as a string and compared in UTC.
    Timestamp,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A value coerced to one of the [`FieldType`]s.
#[derive(Debug, Clone)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Strict coercion of a JSON value to `ty`. Returns `None` instead of
    /// guessing: strings are never parsed as numbers and vice versa.
    pub fn from_json(value: &Value, ty: FieldType) -> Option<FieldValue> {
        match (ty, value) {
            (FieldType::String, Value::String(s)) => Some(FieldValue::String(s.clone())),
            (FieldType::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Some(FieldValue::Integer(i));
                }
                let f = n.as_f64()?;
                let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
                (f.fract() == 0.0 && in_range).then(|| FieldValue::Integer(f as i64))
            }
            (FieldType::Float, Value::Number(n)) => n.as_f64().map(FieldValue::Float),
            (FieldType::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| FieldValue::Timestamp(dt.with_timezone(&Utc))),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::String(_) => 0,
            FieldValue::Integer(_) => 1,
            FieldValue::Float(_) => 2,
            FieldValue::Timestamp(_) => 3,
        }
    }
}

// Values of one field always share a variant; the rank only keeps `Ord`
// total for mixed input.
impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.total_cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

/// Sort direction of one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> SortDirection {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}
