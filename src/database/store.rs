use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::document::Document;
use crate::database::manager::DatabaseError;
use crate::filter::{Condition, FindQuery};
use crate::types::Collection;

/// The persistence engine the API is built on: filtered finds, counts,
/// single-document writes and a grouping average.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Filtered, projected, sorted and windowed find
    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, DatabaseError>;

    /// Number of documents matching the conditions, ignoring any window
    async fn count(&self, collection: Collection, conditions: &[Condition]) -> Result<u64, DatabaseError>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError>;

    /// Insert a document, assigning `_id`/`createdAt` when missing.
    /// Fails with `DatabaseError::Duplicate` on a unique key violation.
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError>;

    /// Merge `patch` into the document; `null` values unset fields.
    /// Returns the updated document, or `None` when it does not exist.
    async fn update_by_id(&self, collection: Collection, id: Uuid, patch: Document) -> Result<Option<Document>, DatabaseError>;

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError>;

    async fn delete_many(&self, collection: Collection, conditions: &[Condition]) -> Result<u64, DatabaseError>;

    /// Mean of `value_field` over documents whose `group_field` references `group_id`.
    /// `None` when the group is empty.
    async fn average(
        &self,
        collection: Collection,
        group_field: &str,
        group_id: Uuid,
        value_field: &str,
    ) -> Result<Option<f64>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

pub type SharedStore = Arc<dyn DocumentStore>;
