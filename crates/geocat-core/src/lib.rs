//! geocat-core: catalog search compiler and keyset pagination engine.
//!
//! Turns a declarative search request into a logical scan over a [`Store`],
//! walks the results with opaque continuation tokens instead of offsets, and
//! projects each record down to the fields the client asked for.
//!
//! # Architecture
//!
//! ```text
//! FieldRegistry ──► query (compile, spatial, temporal) ──┐
//!       │                                                │
//!       └─────────► sort ──► pagination ─────────────────┼──► search ──► Store
//!                                                        │
//!                   projection ──────────────────────────┘
//! ```
//!
//! The registry and settings are immutable and shared through `Arc`. The
//! only I/O is the store's `scan`, `count` and `get`, plus the collection
//! lookups behind [`catalog`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod links;
pub mod pagination;
pub mod projection;
pub mod query;
pub mod registry;
pub mod search;
pub mod sort;
pub mod store;
pub mod types;

pub use catalog::{CollectionList, Conformance, LandingPage};
pub use config::{Config, SearchSettings};
pub use error::{Capability, SearchError, StoreError};
pub use pagination::{Base64JsonCodec, Cursor, PageDirection, Paginator, SeekPredicate, TokenCodec};
pub use projection::{FieldProjector, FieldsRequest, ProjectionSpec};
pub use query::{CompiledPredicate, Operator, Predicate};
pub use registry::{FieldDescriptor, FieldRegistry};
pub use search::{GetSearchParams, MatchContext, SearchPlan, SearchRequest, SearchResponse, SearchService};
pub use sort::{SortBy, SortOrder};
pub use store::{ScanRequest, Store};
pub use types::{Collection, FieldType, FieldValue, Item, SortDirection};
