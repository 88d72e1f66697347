//! Shared test utilities for geocat integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Catalogs are small and deterministic; every item in a
//! fixture carries a distinct id.

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
