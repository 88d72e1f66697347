//! Keyset paginator: opaque continuation tokens and seek predicates.
//!
//! A token records the ordering tuple of a boundary row, the direction it
//! was issued for, and a fingerprint of the [`SortOrder`] that produced it.
//! Decoding against a different order fails instead of silently resuming
//! somewhere else.
//!
//! # Protocol
//!
//! The store is asked for `limit + 1` rows strictly after the boundary (or,
//! for backward pages, strictly after it under the reversed order). The
//! extra row only signals that more rows exist and is never returned.
//!
//! ```text
//! forward  page: next     ⇐ limit+1 rows came back   (from the last row)
//!                previous ⇐ page was reached by token (from the first row)
//! backward page: previous ⇐ limit+1 rows came back   (from the first row)
//!                next     ⇐ always                    (from the last row)
//! ```
//!
//! Consistency is per page only: rows written between two already-issued
//! boundaries can be skipped or seen twice while walking.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SearchError;
use crate::registry::FieldDescriptor;
use crate::sort::{compare_key, SortOrder};
use crate::types::{FieldValue, Item, SortDirection};

/// Longest encoded token accepted before any decoding is attempted.
pub const MAX_TOKEN_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageDirection {
    #[serde(rename = "f")]
    Forward,
    #[serde(rename = "b")]
    Backward,
}

/// Token payload as it travels inside the opaque string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationToken {
    #[serde(rename = "d")]
    pub direction: PageDirection,
    /// [`SortOrder::fingerprint`] of the order the token was issued under.
    #[serde(rename = "k")]
    pub fingerprint: String,
    /// Boundary row's ordering tuple; `null` for a missing value.
    #[serde(rename = "v")]
    pub values: Vec<Value>,
}

/// Wire format of continuation tokens.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, token: &PaginationToken) -> Result<String, SearchError>;

    /// Structural decode only; the paginator checks the payload against the
    /// current order.
    fn decode(&self, raw: &str) -> Result<PaginationToken, SearchError>;
}

/// URL-safe unpadded base64 over compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64JsonCodec;

impl TokenCodec for Base64JsonCodec {
    fn encode(&self, token: &PaginationToken) -> Result<String, SearchError> {
        let json = serde_json::to_vec(token)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(&self, raw: &str) -> Result<PaginationToken, SearchError> {
        if raw.is_empty() {
            return Err(SearchError::invalid_token("token is empty"));
        }
        if raw.len() > MAX_TOKEN_LEN {
            return Err(SearchError::invalid_token(format!(
                "token is longer than {MAX_TOKEN_LEN} bytes"
            )));
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| SearchError::invalid_token("token is not base64url"))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SearchError::invalid_token(format!("malformed token payload: {e}")))
    }
}

/// A decoded, typed scan position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub direction: PageDirection,
    pub values: Vec<Option<FieldValue>>,
}

impl Cursor {
    /// Position of `item` under `order`.
    pub fn at(item: &Item, order: &SortOrder, direction: PageDirection) -> Self {
        Self {
            direction,
            values: order.key_values(item),
        }
    }

    /// The order the store must scan in to serve this cursor.
    pub fn scan_order(&self, order: &SortOrder) -> SortOrder {
        match self.direction {
            PageDirection::Forward => order.clone(),
            PageDirection::Backward => order.reversed(),
        }
    }

    /// Rows strictly past the boundary in the scan direction.
    pub fn seek(&self, order: &SortOrder) -> SeekPredicate {
        SeekPredicate {
            order: self.scan_order(order),
            boundary: self.values.clone(),
        }
    }
}

/// "Strictly after `boundary` under `order`", lexicographic over the tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekPredicate {
    order: SortOrder,
    boundary: Vec<Option<FieldValue>>,
}

impl SeekPredicate {
    pub fn order(&self) -> &SortOrder {
        &self.order
    }

    pub fn boundary(&self) -> &[Option<FieldValue>] {
        &self.boundary
    }

    pub fn admits(&self, item: &Item) -> bool {
        self.order
            .compare_values(&self.order.key_values(item), &self.boundary)
            .is_gt()
    }

    /// The same condition as a disjunction of conjunctions:
    ///
    /// ```text
    /// (k0 after v0)
    /// ∨ (k0 = v0 ∧ k1 after v1)
    /// ∨ (k0 = v0 ∧ k1 = v1 ∧ k2 after v2) …
    /// ```
    pub fn clauses(&self) -> Vec<Vec<SeekTerm>> {
        let keys = self.order.keys();
        (0..keys.len())
            .map(|i| {
                let mut clause: Vec<SeekTerm> = keys[..i]
                    .iter()
                    .zip(&self.boundary)
                    .map(|(k, v)| SeekTerm::Same {
                        field: k.field.clone(),
                        value: v.clone(),
                    })
                    .collect();
                clause.push(SeekTerm::After {
                    field: keys[i].field.clone(),
                    direction: keys[i].direction,
                    value: self.boundary.get(i).cloned().flatten(),
                });
                clause
            })
            .collect()
    }
}

/// One conjunct of an expanded seek predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeekTerm {
    /// Field equals `value`; a missing value only equals a missing value.
    Same {
        field: FieldDescriptor,
        value: Option<FieldValue>,
    },
    /// Field sorts strictly after `value` in `direction`, nulls last when
    /// ascending.
    After {
        field: FieldDescriptor,
        direction: SortDirection,
        value: Option<FieldValue>,
    },
}

impl SeekTerm {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            SeekTerm::Same { field, value } => item.field_value(field) == *value,
            SeekTerm::After {
                field,
                direction,
                value,
            } => compare_key(*direction, item.field_value(field).as_ref(), value.as_ref()).is_gt(),
        }
    }
}

/// One page of rows plus the tokens leading away from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Paginator<C = Base64JsonCodec> {
    codec: C,
}

impl<C: TokenCodec> Paginator<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    pub fn encode(
        &self,
        boundary: &Item,
        order: &SortOrder,
        direction: PageDirection,
    ) -> Result<String, SearchError> {
        let token = PaginationToken {
            direction,
            fingerprint: order.fingerprint(),
            values: order
                .key_values(boundary)
                .iter()
                .map(|v| v.as_ref().map_or(Value::Null, FieldValue::to_json))
                .collect(),
        };
        self.codec.encode(&token)
    }

    /// Decode `raw` and check it belongs to `order`.
    pub fn decode(&self, raw: &str, order: &SortOrder) -> Result<Cursor, SearchError> {
        let token = self.codec.decode(raw)?;
        if token.fingerprint != order.fingerprint() {
            return Err(SearchError::invalid_token(
                "token was issued for a different sort order",
            ));
        }
        if token.values.len() != order.len() {
            return Err(SearchError::invalid_token(format!(
                "token carries {} values for a {}-key order",
                token.values.len(),
                order.len()
            )));
        }

        let values = order
            .keys()
            .iter()
            .zip(&token.values)
            .map(|(key, raw)| match raw {
                Value::Null => Ok(None),
                v => FieldValue::from_json(v, key.field.ty).map(Some).ok_or_else(|| {
                    SearchError::invalid_token(format!(
                        "value for '{}' is not a {}",
                        key.field.name, key.field.ty
                    ))
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Cursor {
            direction: token.direction,
            values,
        })
    }

    /// Cut a scan result into a page and issue its tokens.
    ///
    /// `rows` must be in scan order (as produced for `cursor`) and may hold
    /// up to `limit + 1` entries.
    pub fn paginate(
        &self,
        mut rows: Vec<Item>,
        limit: usize,
        order: &SortOrder,
        cursor: Option<&Cursor>,
    ) -> Result<Page, SearchError> {
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let direction = cursor.map_or(PageDirection::Forward, |c| c.direction);
        let (has_next, has_previous) = match direction {
            PageDirection::Forward => (has_more, cursor.is_some()),
            PageDirection::Backward => {
                rows.reverse();
                (true, has_more)
            }
        };

        let next = match rows.last() {
            Some(last) if has_next => Some(self.encode(last, order, PageDirection::Forward)?),
            _ => None,
        };
        let previous = match rows.first() {
            Some(first) if has_previous => {
                Some(self.encode(first, order, PageDirection::Backward)?)
            }
            _ => None,
        };

        tracing::debug!(
            returned = rows.len(),
            ?direction,
            has_next = next.is_some(),
            has_previous = previous.is_some(),
            "paginated scan"
        );
        Ok(Page {
            items: rows,
            next,
            previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldRegistry;
    use crate::sort::{resolve_sort, SortBy};
    use serde_json::json;

    fn item(id: &str, gsd: Option<f64>) -> Item {
        let mut properties = serde_json::Map::new();
        properties.insert("datetime".into(), json!("2020-01-01T00:00:00Z"));
        if let Some(g) = gsd {
            properties.insert("gsd".into(), json!(g));
        }
        serde_json::from_value(json!({
            "id": id,
            "collection": "c",
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
            "properties": properties,
        }))
        .unwrap()
    }

    fn gsd_order() -> SortOrder {
        resolve_sort(&[SortBy::asc("gsd")], &FieldRegistry::builtin()).unwrap()
    }

    #[test]
    fn decode_inverts_encode() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        let row = item("b", Some(3.5));
        let raw = paginator.encode(&row, &order, PageDirection::Forward).unwrap();
        let cursor = paginator.decode(&raw, &order).unwrap();
        assert_eq!(cursor, Cursor::at(&row, &order, PageDirection::Forward));
        assert_eq!(
            cursor.seek(&order),
            Cursor::at(&row, &order, PageDirection::Forward).seek(&order)
        );
    }

    #[test]
    fn long_fractional_floats_decode_exactly() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        let row = item("b", Some(10272.191780821919));
        let raw = paginator.encode(&row, &order, PageDirection::Forward).unwrap();
        let cursor = paginator.decode(&raw, &order).unwrap();
        assert_eq!(cursor.values[0], Some(FieldValue::Float(10272.191780821919)));

        let seek = cursor.seek(&order);
        assert!(!seek.admits(&row));
        assert!(seek.admits(&item("c", Some(10272.191780821919))));
    }

    proptest::proptest! {
        #[test]
        fn finite_floats_survive_the_round_trip(
            gsd in proptest::num::f64::POSITIVE
                | proptest::num::f64::NEGATIVE
                | proptest::num::f64::NORMAL
                | proptest::num::f64::SUBNORMAL
                | proptest::num::f64::ZERO,
        ) {
            let paginator = Paginator::<Base64JsonCodec>::default();
            let order = gsd_order();
            let raw = paginator
                .encode(&item("b", Some(gsd)), &order, PageDirection::Forward)
                .unwrap();
            let cursor = paginator.decode(&raw, &order).unwrap();
            match &cursor.values[0] {
                Some(FieldValue::Float(decoded)) => {
                    proptest::prop_assert_eq!(decoded.to_bits(), gsd.to_bits())
                }
                other => proptest::prop_assert!(false, "decoded {:?}", other),
            }
        }
    }

    #[test]
    fn missing_values_survive_the_round_trip() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        let raw = paginator
            .encode(&item("b", None), &order, PageDirection::Backward)
            .unwrap();
        let cursor = paginator.decode(&raw, &order).unwrap();
        assert_eq!(cursor.values[0], None);
        assert_eq!(cursor.direction, PageDirection::Backward);
    }

    #[test]
    fn tokens_do_not_cross_orders() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let raw = paginator
            .encode(&item("b", Some(1.0)), &gsd_order(), PageDirection::Forward)
            .unwrap();
        let other = resolve_sort(&[SortBy::desc("gsd")], &FieldRegistry::builtin()).unwrap();
        let err = paginator.decode(&raw, &other).unwrap_err();
        assert!(matches!(err, SearchError::InvalidToken { .. }));
    }

    #[test]
    fn garbage_is_an_invalid_token() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        for raw in ["", "!!!", "bm90IGpzb24", &"A".repeat(MAX_TOKEN_LEN + 1)] {
            let err = paginator.decode(raw, &order).unwrap_err();
            assert!(matches!(err, SearchError::InvalidToken { .. }), "{raw:?}");
        }
    }

    #[test]
    fn forged_payload_with_wrong_types_is_rejected() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        let forged = PaginationToken {
            direction: PageDirection::Forward,
            fingerprint: order.fingerprint(),
            values: vec![json!("fast"), json!("b")],
        };
        let raw = Base64JsonCodec.encode(&forged).unwrap();
        let err = paginator.decode(&raw, &order).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid pagination token: value for 'gsd' is not a float");
    }

    #[test]
    fn seek_is_strict() {
        let order = gsd_order();
        let boundary = item("b", Some(2.0));
        let seek = Cursor::at(&boundary, &order, PageDirection::Forward).seek(&order);
        assert!(!seek.admits(&boundary));
        assert!(seek.admits(&item("c", Some(2.0))));
        assert!(!seek.admits(&item("a", Some(2.0))));
        assert!(seek.admits(&item("a", Some(3.0))));
        assert!(seek.admits(&item("a", None)));
    }

    #[test]
    fn backward_seek_scans_the_reversed_order() {
        let order = gsd_order();
        let boundary = item("b", Some(2.0));
        let seek = Cursor::at(&boundary, &order, PageDirection::Backward).seek(&order);
        assert!(seek.admits(&item("a", Some(2.0))));
        assert!(seek.admits(&item("z", Some(1.0))));
        assert!(!seek.admits(&item("c", Some(2.0))));
    }

    #[test]
    fn clauses_agree_with_admits() {
        let order = gsd_order();
        let seek = Cursor::at(&item("m", Some(2.0)), &order, PageDirection::Forward).seek(&order);
        let clauses = seek.clauses();
        assert_eq!(clauses.len(), 2);
        for candidate in [
            item("a", Some(1.0)),
            item("a", Some(2.0)),
            item("z", Some(2.0)),
            item("a", Some(9.0)),
            item("a", None),
        ] {
            let expanded = clauses.iter().any(|c| c.iter().all(|t| t.matches(&candidate)));
            assert_eq!(expanded, seek.admits(&candidate), "{}", candidate.id);
        }
    }

    proptest::proptest! {
        #[test]
        fn expanded_clauses_match_admits(
            boundary in (proptest::option::of(0u8..4), 0u8..4),
            candidate in (proptest::option::of(0u8..4), 0u8..4),
            descending in proptest::bool::ANY,
            backward in proptest::bool::ANY,
        ) {
            let sortby = if descending { SortBy::desc("gsd") } else { SortBy::asc("gsd") };
            let order = resolve_sort(&[sortby], &FieldRegistry::builtin()).unwrap();
            let direction = if backward { PageDirection::Backward } else { PageDirection::Forward };
            let at = item(&boundary.1.to_string(), boundary.0.map(f64::from));
            let seek = Cursor::at(&at, &order, direction).seek(&order);

            let row = item(&candidate.1.to_string(), candidate.0.map(f64::from));
            let expanded = seek.clauses().iter().any(|c| c.iter().all(|t| t.matches(&row)));
            proptest::prop_assert_eq!(expanded, seek.admits(&row));
        }
    }

    #[test]
    fn first_page_has_no_previous() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        let rows = vec![item("a", Some(1.0)), item("b", Some(2.0)), item("c", Some(3.0))];
        let page = paginator.paginate(rows, 2, &order, None).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next.is_some());
        assert!(page.previous.is_none());
    }

    #[test]
    fn backward_page_is_returned_in_order() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        let cursor = Cursor::at(&item("c", Some(3.0)), &order, PageDirection::Backward);
        let rows = vec![item("b", Some(2.0)), item("a", Some(1.0))];
        let page = paginator.paginate(rows, 2, &order, Some(&cursor)).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(page.next.is_some());
        assert!(page.previous.is_none());
    }

    #[test]
    fn empty_pages_issue_no_tokens() {
        let paginator = Paginator::<Base64JsonCodec>::default();
        let order = gsd_order();
        let cursor = Cursor::at(&item("c", Some(3.0)), &order, PageDirection::Forward);
        let page = paginator.paginate(Vec::new(), 2, &order, Some(&cursor)).unwrap();
        assert!(page.next.is_none() && page.previous.is_none());
    }
}
