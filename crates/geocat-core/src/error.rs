//! Error taxonomy for the search pipeline.
//!
//! Client-input errors carry the offending field or value so a caller can
//! correct the request. Store errors wrap the collaborator's failure and keep
//! it reachable through [`std::error::Error::source`].

use crate::types::FieldType;
use thiserror::Error;

/// Boxed cause carried by store failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Optional processing stages that can be switched off in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Match statistics (`context.matched`), costs an extra count query.
    Context,
    /// Field projection (`fields`).
    Fields,
    /// Caller-supplied sort order (`sortby`).
    Sort,
    /// Typed property predicates (`query`).
    Query,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Context => write!(f, "context"),
            Capability::Fields => write!(f, "fields"),
            Capability::Sort => write!(f, "sort"),
            Capability::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("unsupported operator '{operator}' on field '{field}' (expected one of eq, ne, lt, le, gt, ge)")]
    UnsupportedOperator { field: String, operator: String },

    #[error("value {value} for field '{field}' is not a valid {expected}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        value: serde_json::Value,
    },

    #[error("invalid datetime '{value}': {reason}")]
    InvalidTemporalRange { value: String, reason: String },

    #[error("invalid spatial filter: {reason}")]
    InvalidSpatialFilter { reason: String },

    #[error("invalid pagination token: {reason}")]
    InvalidToken { reason: String },

    #[error("limit {limit} is out of range (expected 1..={max})")]
    LimitOutOfRange { limit: u64, max: u64 },

    #[error("sort field '{field}' appears more than once")]
    DuplicateSortField { field: String },

    #[error("the {capability} capability is disabled")]
    CapabilityDisabled { capability: Capability },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("item '{id}' not found")]
    NotFound { id: String },

    #[error("collection '{id}' not found")]
    CollectionNotFound { id: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] BoxError),

    #[error("store execution failed: {0}")]
    StoreExecutionError(#[source] BoxError),

    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// `true` when the request itself is at fault and retrying it unchanged
    /// cannot succeed.
    pub fn is_client_error(&self) -> bool {
        match self {
            SearchError::UnknownField { .. }
            | SearchError::UnsupportedOperator { .. }
            | SearchError::TypeMismatch { .. }
            | SearchError::InvalidTemporalRange { .. }
            | SearchError::InvalidSpatialFilter { .. }
            | SearchError::InvalidToken { .. }
            | SearchError::LimitOutOfRange { .. }
            | SearchError::DuplicateSortField { .. }
            | SearchError::CapabilityDisabled { .. }
            | SearchError::InvalidParameter { .. } => true,
            SearchError::NotFound { .. }
            | SearchError::CollectionNotFound { .. }
            | SearchError::StoreUnavailable(_)
            | SearchError::StoreExecutionError(_)
            | SearchError::Serialization(_) => false,
        }
    }

    pub(crate) fn invalid_token(reason: impl Into<String>) -> Self {
        SearchError::InvalidToken {
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SearchError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("{0}")]
    Unavailable(#[source] BoxError),
    /// The store was reached but rejected or failed the operation.
    #[error("{0}")]
    Execution(#[source] BoxError),
}

impl StoreError {
    pub fn unavailable(cause: impl Into<BoxError>) -> Self {
        StoreError::Unavailable(cause.into())
    }

    pub fn execution(cause: impl Into<BoxError>) -> Self {
        StoreError::Execution(cause.into())
    }
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(cause) => SearchError::StoreUnavailable(cause),
            StoreError::Execution(cause) => SearchError::StoreExecutionError(cause),
        }
    }
}
