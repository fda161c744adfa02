use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::document::{apply_patch, get_path, id_of, project, reference, with_identity, Document};
use crate::database::manager::DatabaseError;
use crate::database::store::DocumentStore;
use crate::filter::filter_order::FilterOrder;
use crate::filter::filter_where::values_equal;
use crate::filter::{Condition, FindQuery};
use crate::types::Collection;

/// In-process document store. Conditions are evaluated in Rust; every write takes the
/// collection lock so unique checks and the write are atomic.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        collection: Collection,
        docs: &[Document],
        candidate: &Document,
        skip_id: Option<Uuid>,
    ) -> Result<(), DatabaseError> {
        for key in collection.unique_keys() {
            let clash = docs.iter().filter(|d| skip_id.is_none() || id_of(d) != skip_id).any(|existing| {
                key.iter().all(|field| match (get_path(existing, field), get_path(candidate, field)) {
                    (Some(a), Some(b)) => values_equal(a, b),
                    _ => false,
                })
            });
            if clash {
                return Err(DatabaseError::Duplicate(format!("{}({})", collection, key.join(", "))));
            }
        }
        Ok(())
    }
}

fn matches_all(doc: &Document, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| c.matches(doc))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<&Document> = collections
            .get(&query.collection)
            .map(|docs| docs.iter().filter(|d| matches_all(d, &query.conditions)).collect())
            .unwrap_or_default();

        docs.sort_by(|a, b| FilterOrder::compare(a, b, &query.sort));

        let window = docs
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit.map(|l| l as usize).unwrap_or(usize::MAX));

        Ok(match &query.select {
            Some(fields) => window.map(|d| project(d, fields)).collect(),
            None => window.cloned().collect(),
        })
    }

    async fn count(&self, collection: Collection, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| matches_all(d, conditions)).count() as u64)
            .unwrap_or(0))
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError> {
        let doc = with_identity(doc);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|d| id_of(d) == id_of(&doc)) {
            return Err(DatabaseError::Duplicate(format!("{}(_id)", collection)));
        }
        Self::check_unique(collection, docs, &doc, None)?;
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(&self, collection: Collection, id: Uuid, patch: Document) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        let Some(position) = docs.iter().position(|d| id_of(d) == Some(id)) else {
            return Ok(None);
        };

        let mut updated = docs[position].clone();
        apply_patch(&mut updated, &patch);
        Self::check_unique(collection, docs, &updated, Some(id))?;
        docs[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| id_of(d) == Some(id))
            .map(|position| docs.remove(position)))
    }

    async fn delete_many(&self, collection: Collection, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches_all(d, conditions));
        Ok((before - docs.len()) as u64)
    }

    async fn average(
        &self,
        collection: Collection,
        group_field: &str,
        group_id: Uuid,
        value_field: &str,
    ) -> Result<Option<f64>, DatabaseError> {
        let collections = self.collections.read().await;
        let values: Vec<f64> = collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| reference(d, group_field) == Some(group_id))
                    .filter_map(|d| d.get(value_field).and_then(Value::as_f64))
                    .collect()
            })
            .unwrap_or_default();

        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOp, SortKey};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn find_filters_sorts_and_windows() {
        let store = MemoryStore::new();
        for (title, tuition) in [("a", 100), ("b", 300), ("c", 200), ("d", 50)] {
            store
                .insert(Collection::Courses, doc(json!({ "title": title, "tuition": tuition })))
                .await
                .unwrap();
        }

        let query = FindQuery {
            collection: Collection::Courses,
            conditions: vec![Condition::new("tuition", FilterOp::Gte, json!(100))],
            select: Some(vec!["title".to_string()]),
            sort: vec![SortKey::desc("tuition")],
            skip: 1,
            limit: Some(1),
        };
        let found = store.find(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["title"], json!("c"));
        assert!(found[0].get("tuition").is_none());
        assert!(found[0].contains_key("_id"));

        let count = store.count(Collection::Courses, &query.conditions).await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn enforces_unique_keys() {
        let store = MemoryStore::new();
        let bootcamp = Uuid::new_v4().to_string();
        let user = Uuid::new_v4().to_string();
        store
            .insert(Collection::Reviews, doc(json!({ "bootcamp": bootcamp, "user": user, "rating": 8 })))
            .await
            .unwrap();
        let err = store
            .insert(Collection::Reviews, doc(json!({ "bootcamp": bootcamp, "user": user, "rating": 2 })))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate(_)));
    }

    #[tokio::test]
    async fn update_unsets_and_average_groups() {
        let store = MemoryStore::new();
        let parent = store
            .insert(Collection::Bootcamps, doc(json!({ "name": "X", "averageCost": 10 })))
            .await
            .unwrap();
        let parent_id = id_of(&parent).unwrap();

        assert_eq!(store.average(Collection::Courses, "bootcamp", parent_id, "tuition").await.unwrap(), None);
        for tuition in [100, 200] {
            store
                .insert(Collection::Courses, doc(json!({ "bootcamp": parent_id.to_string(), "tuition": tuition })))
                .await
                .unwrap();
        }
        let avg = store.average(Collection::Courses, "bootcamp", parent_id, "tuition").await.unwrap();
        assert_eq!(avg, Some(150.0));

        let updated = store
            .update_by_id(Collection::Bootcamps, parent_id, doc(json!({ "averageCost": null })))
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.contains_key("averageCost"));

        let missing = store
            .update_by_id(Collection::Bootcamps, Uuid::new_v4(), doc(json!({ "name": "Y" })))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_many_removes_matches() {
        let store = MemoryStore::new();
        let parent = Uuid::new_v4().to_string();
        for _ in 0..3 {
            store
                .insert(Collection::Courses, doc(json!({ "bootcamp": parent, "tuition": 1 })))
                .await
                .unwrap();
        }
        store.insert(Collection::Courses, doc(json!({ "bootcamp": "other" }))).await.unwrap();

        let removed = store
            .delete_many(Collection::Courses, &[Condition::eq("bootcamp", parent.clone())])
            .await
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(store.count(Collection::Courses, &[]).await.unwrap(), 1);
    }
}
