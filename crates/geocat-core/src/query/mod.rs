//! Predicate layer: typed filter conditions handed to the store.
//!
//! A request's filters compile into a flat conjunction of [`Predicate`]s:
//!
//! ```text
//! query    ──► compile  ──► Compare(field op value)*
//! bbox     ─┐
//! intersects┴► spatial  ──► Intersects(geometry)
//! datetime ──► temporal ──► Compare(datetime ge/le/eq t)*
//! collections / ids     ──► Collections / Ids
//! ```
//!
//! [`Predicate::matches`] is the reference meaning of each predicate; stores
//! that translate predicates into their own query language must agree with it.

pub mod compile;
pub mod spatial;
pub mod temporal;

pub use compile::{compile_query, QueryFilter};
pub use spatial::{bbox_polygon, spatial_predicate};
pub use temporal::DatetimeFilter;

use geo::Intersects;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::registry::FieldDescriptor;
use crate::types::{FieldValue, Item};

/// Comparison operators accepted in `query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
    ];

    pub fn parse(name: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
        }
    }

    /// Whether `record <op> operand` holds, given `record.cmp(operand)`.
    pub fn evaluate(self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering.is_eq(),
            Operator::Ne => ordering.is_ne(),
            Operator::Lt => ordering.is_lt(),
            Operator::Le => ordering.is_le(),
            Operator::Gt => ordering.is_gt(),
            Operator::Ge => ordering.is_ge(),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `field <op> value` with the value already coerced to the field's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPredicate {
    pub field: FieldDescriptor,
    pub op: Operator,
    pub value: FieldValue,
}

impl CompiledPredicate {
    pub fn new(field: FieldDescriptor, op: Operator, value: FieldValue) -> Self {
        Self { field, op, value }
    }

    /// A record without the field never matches, whatever the operator.
    pub fn matches(&self, item: &Item) -> bool {
        item.field_value(&self.field)
            .is_some_and(|v| self.op.evaluate(v.cmp(&self.value)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare(CompiledPredicate),
    /// The record geometry intersects this shape.
    Intersects(geo_types::Geometry<f64>),
    /// The record belongs to one of these collections.
    Collections(BTreeSet<String>),
    /// The record id is one of these.
    Ids(Vec<String>),
}

impl Predicate {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Predicate::Compare(p) => p.matches(item),
            Predicate::Intersects(shape) => item.shape().is_some_and(|g| g.intersects(shape)),
            Predicate::Collections(ids) => ids.contains(&item.collection),
            Predicate::Ids(ids) => ids.iter().any(|id| *id == item.id),
        }
    }

    /// The registry field a comparison targets, if any.
    pub fn field(&self) -> Option<&FieldDescriptor> {
        match self {
            Predicate::Compare(p) => Some(&p.field),
            Predicate::Intersects(_) | Predicate::Collections(_) | Predicate::Ids(_) => None,
        }
    }
}

/// `true` when every predicate holds (the empty conjunction is `true`).
pub fn matches_all(predicates: &[Predicate], item: &Item) -> bool {
    predicates.iter().all(|p| p.matches(item))
}
