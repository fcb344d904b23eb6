//! # MongoDB Atlas Document Store
//!
//! Adapter that stores, filters, and vector-searches [`model::Document`]s in
//! one MongoDB Atlas collection. Indexing, persistence, and similarity
//! search are owned by Atlas; this crate translates the generic
//! document/filter model into native queries and hands them to the driver.
//!
//! Construction is two-phase: [`AtlasConfig`] is an eager, cheap value, and
//! the client connection is opened lazily on the first operation.

pub mod config;
pub mod query;
pub mod store;

pub use config::AtlasConfig;
pub use query::filter_to_query;
pub use store::AtlasDocumentStore;
