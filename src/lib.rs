//! geocat: catalog search service.
//!
//! The search pipeline lives in [`geocat_core`], the reference store and
//! catalog loaders in [`geocat_store`]. This crate adds the HTTP adapter and
//! the `geocat` binary, and re-exports both libraries so integration tests
//! can import everything from one place.
//!
//! # Architecture
//!
//! ```text
//! catalog file ──► geocat_store::MemoryStore
//!                        │
//! HTTP / CLI ──► http ──► geocat_core::SearchService ──► page envelope
//! ```

pub mod http;

pub use geocat_core;
pub use geocat_store;

pub use geocat_core::{Config, SearchError, SearchRequest, SearchResponse, SearchService, SearchSettings};
pub use geocat_store::MemoryStore;
