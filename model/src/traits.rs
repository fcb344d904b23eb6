//! Core traits for the corpus document store.

use crate::document::Document;
use crate::error::StoreError;
use crate::filter::FilterNode;
use crate::policy::DuplicatePolicy;
use async_trait::async_trait;

/// Unified interface over document store implementations.
///
/// The real adapter translates filters into native queries and delegates
/// every operation to the external service; the in-memory fake in the
/// `testing` crate implements the same observable semantics for tests.
/// Implementations are shared behind `Arc` and must be callable from any
/// number of tasks concurrently.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns how many documents the store currently holds.
    async fn count_documents(&self) -> Result<usize, StoreError>;

    /// Returns the documents matching `filters`, or every document when no
    /// filter is given.
    async fn filter_documents(
        &self,
        filters: Option<&FilterNode>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Writes documents keyed by id, resolving collisions per `policy`.
    ///
    /// # Returns
    /// The number of documents written. Under [`DuplicatePolicy::Fail`] the
    /// first collision aborts the call with
    /// [`StoreError::DuplicateDocument`]; documents written earlier in the
    /// same call remain.
    async fn write_documents(
        &self,
        documents: Vec<Document>,
        policy: DuplicatePolicy,
    ) -> Result<usize, StoreError>;

    /// Deletes the documents with the given ids. Ids that are not present
    /// are ignored.
    async fn delete_documents(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Returns the name of this store implementation.
    fn store_name(&self) -> &'static str;
}
