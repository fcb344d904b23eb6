//! Shared test support for the corpus workspace.
//!
//! Provides an in-memory [`model::DocumentStore`] fake with the same
//! observable filter and duplicate-policy semantics as the real adapter,
//! plus the document fixtures used across test files.

mod fixtures;
mod memory_store;

pub use fixtures::*;
pub use memory_store::InMemoryDocumentStore;
