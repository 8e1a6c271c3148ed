use async_trait::async_trait;

use crate::contract::model::Document;
use crate::domain::query::{Filter, FindOptions};

/// Port for the domain layer: the document-store operations the executor needs.
/// Object-safe and async-friendly via `async_trait`.
///
/// Implementations must be safe for concurrent use; the service shares one
/// handle across all in-flight requests and applies no locking of its own.
/// Returned documents include the store identity under `_id`.
#[async_trait]
pub trait AppointmentsRepository: Send + Sync {
    /// Insert a document and return the identity the store assigned to it.
    async fn insert(&self, doc: Document) -> anyhow::Result<String>;
    /// First document matching the filter, in natural store order.
    async fn find_one(&self, filter: &Filter) -> anyhow::Result<Option<Document>>;
    /// All documents matching the filter, ordered by `options.sort` and then
    /// by natural store order.
    async fn find_many(&self, filter: &Filter, options: &FindOptions)
        -> anyhow::Result<Vec<Document>>;
    /// Replace the first match with `doc`, keeping its identity.
    /// Returns the document as it was before replacement.
    async fn find_one_and_replace(
        &self,
        filter: &Filter,
        doc: Document,
    ) -> anyhow::Result<Option<Document>>;
    /// Remove the first match and return it.
    async fn find_one_and_delete(&self, filter: &Filter) -> anyhow::Result<Option<Document>>;
    /// Remove every match. Returns how many documents were removed.
    async fn delete_many(&self, filter: &Filter) -> anyhow::Result<u64>;
}
