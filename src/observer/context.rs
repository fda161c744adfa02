use uuid::Uuid;

use crate::database::document::{reference, Document};
use crate::database::store::SharedStore;
use crate::types::{Collection, Operation};

/// A confirmed write: the document before and after the change.
/// `before` is `None` on create, `after` is `None` on delete.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub operation: Operation,
    pub collection: Collection,
    pub before: Option<Document>,
    pub after: Option<Document>,
}

impl ChangeEvent {
    pub fn created(collection: Collection, after: Document) -> Self {
        Self { operation: Operation::Create, collection, before: None, after: Some(after) }
    }

    pub fn updated(collection: Collection, before: Document, after: Document) -> Self {
        Self { operation: Operation::Update, collection, before: Some(before), after: Some(after) }
    }

    pub fn deleted(collection: Collection, before: Document) -> Self {
        Self { operation: Operation::Delete, collection, before: Some(before), after: None }
    }

    /// Distinct ids referenced by `field` across the old and new document
    pub fn parent_ids(&self, field: &str) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(2);
        for doc in [self.before.as_ref(), self.after.as_ref()].into_iter().flatten() {
            if let Some(id) = reference(doc, field) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// Everything an observer may touch while handling one change
pub struct ObserverContext {
    pub event: ChangeEvent,
    pub store: SharedStore,
}

impl ObserverContext {
    pub fn new(event: ChangeEvent, store: SharedStore) -> Self {
        Self { event, store }
    }
}
