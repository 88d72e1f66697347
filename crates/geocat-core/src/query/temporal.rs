//! Temporal filter: an RFC 3339 instant or a `start/end` interval where
//! either end may be open (`..` or empty).

use chrono::{DateTime, Utc};

use crate::error::SearchError;
use crate::query::{CompiledPredicate, Operator};
use crate::registry::FieldDescriptor;
use crate::types::FieldValue;

const OPEN_END: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeFilter {
    Instant(DateTime<Utc>),
    /// Inclusive on both ends; at least one end is set.
    Range {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl DatetimeFilter {
    pub fn parse(raw: &str) -> Result<Self, SearchError> {
        let invalid = |reason: String| SearchError::InvalidTemporalRange {
            value: raw.to_string(),
            reason,
        };
        let raw_trimmed = raw.trim();

        let Some((start, end)) = raw_trimmed.split_once('/') else {
            return parse_instant(raw_trimmed)
                .map(DatetimeFilter::Instant)
                .map_err(invalid);
        };

        let start = parse_bound(start).map_err(&invalid)?;
        let end = parse_bound(end).map_err(&invalid)?;
        match (start, end) {
            (None, None) => Err(invalid("both ends of the interval are open".to_string())),
            (Some(s), Some(e)) if s > e => Err(invalid("interval start is after its end".to_string())),
            _ => Ok(DatetimeFilter::Range { start, end }),
        }
    }

    /// Comparisons against the registry's temporal field.
    pub fn predicates(&self, temporal: &FieldDescriptor) -> Vec<CompiledPredicate> {
        let compare = |op, ts: DateTime<Utc>| {
            CompiledPredicate::new(temporal.clone(), op, FieldValue::Timestamp(ts))
        };
        match *self {
            DatetimeFilter::Instant(ts) => vec![compare(Operator::Eq, ts)],
            DatetimeFilter::Range { start, end } => start
                .map(|s| compare(Operator::Ge, s))
                .into_iter()
                .chain(end.map(|e| compare(Operator::Le, e)))
                .collect(),
        }
    }
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("'{s}' is not an RFC 3339 timestamp ({e})"))
}

fn parse_bound(s: &str) -> Result<Option<DateTime<Utc>>, String> {
    let s = s.trim();
    if s.is_empty() || s == OPEN_END {
        Ok(None)
    } else {
        parse_instant(s).map(Some)
    }
}
