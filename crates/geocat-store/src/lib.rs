//! geocat-store: reference [`Store`](geocat_core::Store) implementation.
//!
//! [`MemoryStore`] keeps every item in memory and evaluates scans the way a
//! relational backend would (filter, order with nulls last, limit). The
//! [`loader`] module fills it from GeoJSON FeatureCollection files or
//! newline-delimited item files.

pub mod loader;
pub mod memory;

pub use loader::{load_catalog, load_collections, load_feature_collection, load_ndjson, LoadError};
pub use memory::MemoryStore;
