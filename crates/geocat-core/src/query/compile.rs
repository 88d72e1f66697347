//! `query` compilation: `{field: {op: value}}` into typed comparisons.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::SearchError;
use crate::query::{CompiledPredicate, Operator};
use crate::registry::FieldRegistry;
use crate::types::FieldValue;

/// Property filter as it arrives in a request: field name → operator → value.
///
/// Both levels are ordered maps, so compiled output is sorted by field name
/// and then by operator name regardless of how the client wrote them.
pub type QueryFilter = BTreeMap<String, BTreeMap<String, Value>>;

/// Validate and type every entry of `query` against `registry`.
///
/// Fails on the first unknown field, unsupported operator or value that does
/// not coerce to the field's type. Contradictory constraints on one field are
/// kept as-is; they simply match nothing.
pub fn compile_query(
    query: &QueryFilter,
    registry: &FieldRegistry,
) -> Result<Vec<CompiledPredicate>, SearchError> {
    let mut compiled = Vec::new();
    for (name, expressions) in query {
        let field = registry.resolve(name)?;
        for (op_name, raw) in expressions {
            let op = Operator::parse(op_name).ok_or_else(|| SearchError::UnsupportedOperator {
                field: name.clone(),
                operator: op_name.clone(),
            })?;
            let value =
                FieldValue::from_json(raw, field.ty).ok_or_else(|| SearchError::TypeMismatch {
                    field: name.clone(),
                    expected: field.ty,
                    value: raw.clone(),
                })?;
            compiled.push(CompiledPredicate::new(field.clone(), op, value));
        }
    }
    Ok(compiled)
}
