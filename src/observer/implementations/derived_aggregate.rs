// Maintains a rounded mean of a child field as a denormalized field on the parent
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Number, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::document::Document;
use crate::database::store::DocumentStore;
use crate::observer::context::{ChangeEvent, ObserverContext};
use crate::observer::error::ObserverError;
use crate::observer::traits::Observer;
use crate::types::{Collection, Operation};

/// How the raw mean is stored on the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round up to the next multiple of ten, stored as an integer
    CeilToTen,
    /// Round half away from zero to two decimals
    TwoDecimals,
}

impl Rounding {
    pub fn apply(&self, mean: f64) -> Value {
        match self {
            Rounding::CeilToTen => Value::from(((mean / 10.0).ceil() * 10.0) as i64),
            Rounding::TwoDecimals => {
                let rounded = (mean * 100.0).round() / 100.0;
                Number::from_f64(rounded).map(Value::Number).unwrap_or(Value::Null)
            }
        }
    }
}

pub struct DerivedAggregate {
    name: &'static str,
    child: Collection,
    parent: Collection,
    /// Reference field on the child pointing at the parent
    parent_field: &'static str,
    value_field: &'static str,
    target_field: &'static str,
    rounding: Rounding,
    timeout: Duration,
    // Serializes read-then-write per parent so the last recompute sees the final child set
    locks: StdMutex<HashMap<Uuid, LockEntry>>,
}

struct LockEntry {
    serial: Arc<Mutex<()>>,
    holders: usize,
}

/// Claim on one parent's lock entry. Dropping it, including when the
/// recompute future is cancelled, removes the entry once no one holds it.
struct ParentLock<'a> {
    locks: &'a StdMutex<HashMap<Uuid, LockEntry>>,
    parent_id: Uuid,
    serial: Arc<Mutex<()>>,
}

impl Drop for ParentLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Entry::Occupied(mut entry) = locks.entry(self.parent_id) {
            entry.get_mut().holders -= 1;
            if entry.get().holders == 0 {
                entry.remove();
            }
        }
    }
}

impl DerivedAggregate {
    /// Course tuitions → `bootcamps.averageCost`
    pub fn average_cost() -> Self {
        Self::new("AverageCost", Collection::Courses, "tuition", "averageCost", Rounding::CeilToTen)
    }

    /// Review ratings → `bootcamps.averageRating`
    pub fn average_rating() -> Self {
        Self::new("AverageRating", Collection::Reviews, "rating", "averageRating", Rounding::TwoDecimals)
    }

    fn new(
        name: &'static str,
        child: Collection,
        value_field: &'static str,
        target_field: &'static str,
        rounding: Rounding,
    ) -> Self {
        Self {
            name,
            child,
            parent: Collection::Bootcamps,
            parent_field: "bootcamp",
            value_field,
            target_field,
            rounding,
            timeout: Duration::from_secs(5),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Recompute the aggregate for one parent and write it back.
    /// An empty group unsets the field. Returns the stored value.
    pub async fn recompute_aggregate(&self, store: &dyn DocumentStore, parent_id: Uuid) -> Result<Option<Value>, ObserverError> {
        let parent = self.lock_for(parent_id);
        let _serial = parent.serial.lock().await;
        self.recompute_locked(store, parent_id).await
    }

    async fn recompute_locked(&self, store: &dyn DocumentStore, parent_id: Uuid) -> Result<Option<Value>, ObserverError> {
        let mean = store
            .average(self.child, self.parent_field, parent_id, self.value_field)
            .await?;
        let value = mean.map(|m| self.rounding.apply(m));

        let mut patch = Document::new();
        patch.insert(self.target_field.to_string(), value.clone().unwrap_or(Value::Null));

        match store.update_by_id(self.parent, parent_id, patch).await? {
            Some(_) => {
                tracing::debug!("{} of {} {} set to {:?}", self.target_field, self.parent, parent_id, value);
            }
            None => {
                // Parent is gone (e.g. children removed by a cascade); nothing to maintain
                tracing::warn!("{}: {} {} not found, aggregate not written", self.name, self.parent, parent_id);
            }
        }
        Ok(value)
    }

    fn lock_for(&self, parent_id: Uuid) -> ParentLock<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = locks
            .entry(parent_id)
            .or_insert_with(|| LockEntry { serial: Arc::new(Mutex::new(())), holders: 0 });
        entry.holders += 1;
        ParentLock { locks: &self.locks, parent_id, serial: entry.serial.clone() }
    }

    #[cfg(test)]
    fn held_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Observer for DerivedAggregate {
    fn name(&self) -> &'static str {
        self.name
    }

    fn watches(&self, event: &ChangeEvent) -> bool {
        event.collection == self.child
            && matches!(event.operation, Operation::Create | Operation::Update | Operation::Delete)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, ctx: &ObserverContext) -> Result<(), ObserverError> {
        for parent_id in ctx.event.parent_ids(self.parent_field) {
            self.recompute_aggregate(ctx.store.as_ref(), parent_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::join_all;
    use serde_json::json;

    use super::*;
    use crate::database::document::id_of;
    use crate::database::memory::MemoryStore;
    use crate::database::store::SharedStore;
    use crate::observer::context::ChangeEvent;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn bootcamp(store: &SharedStore) -> Uuid {
        let created = store.insert(Collection::Bootcamps, doc(json!({ "name": "Devworks" }))).await.unwrap();
        id_of(&created).unwrap()
    }

    async fn add_child(store: &SharedStore, collection: Collection, body: Value) -> Document {
        store.insert(collection, doc(body)).await.unwrap()
    }

    async fn parent_field(store: &SharedStore, id: Uuid, field: &str) -> Option<Value> {
        store.find_by_id(Collection::Bootcamps, id).await.unwrap().unwrap().get(field).cloned()
    }

    #[test]
    fn rounds_cost_up_to_tens() {
        assert_eq!(Rounding::CeilToTen.apply(200.0), json!(200));
        assert_eq!(Rounding::CeilToTen.apply(8833.333), json!(8840));
        assert_eq!(Rounding::CeilToTen.apply(1.0), json!(10));
    }

    #[test]
    fn rounds_rating_to_two_decimals() {
        assert_eq!(Rounding::TwoDecimals.apply(7.0), json!(7.0));
        assert_eq!(Rounding::TwoDecimals.apply(22.0 / 3.0), json!(7.33));
        assert_eq!(Rounding::TwoDecimals.apply(8.125), json!(8.13));
    }

    #[tokio::test]
    async fn average_cost_of_three_courses() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let id = bootcamp(&store).await;
        for tuition in [100, 200, 300] {
            add_child(&store, Collection::Courses, json!({ "bootcamp": id.to_string(), "tuition": tuition })).await;
        }

        let observer = DerivedAggregate::average_cost();
        let value = observer.recompute_aggregate(store.as_ref(), id).await.unwrap();
        assert_eq!(value, Some(json!(200)));
        assert_eq!(parent_field(&store, id, "averageCost").await, Some(json!(200)));
    }

    #[tokio::test]
    async fn average_rating_of_two_reviews() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let id = bootcamp(&store).await;
        for rating in [8, 6] {
            add_child(
                &store,
                Collection::Reviews,
                json!({ "bootcamp": id.to_string(), "user": Uuid::new_v4().to_string(), "rating": rating }),
            )
            .await;
        }

        DerivedAggregate::average_rating().recompute_aggregate(store.as_ref(), id).await.unwrap();
        let stored = parent_field(&store, id, "averageRating").await.unwrap();
        assert_eq!(stored.as_f64(), Some(7.0));
    }

    #[tokio::test]
    async fn removing_last_child_unsets_field() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let id = bootcamp(&store).await;
        let course = add_child(&store, Collection::Courses, json!({ "bootcamp": id.to_string(), "tuition": 500 })).await;

        let observer = DerivedAggregate::average_cost();
        observer.execute(&ObserverContext::new(ChangeEvent::created(Collection::Courses, course.clone()), store.clone())).await.unwrap();
        assert_eq!(parent_field(&store, id, "averageCost").await, Some(json!(500)));

        let removed = store.delete_by_id(Collection::Courses, id_of(&course).unwrap()).await.unwrap().unwrap();
        observer
            .execute(&ObserverContext::new(ChangeEvent::deleted(Collection::Courses, removed), store.clone()))
            .await
            .unwrap();
        assert_eq!(parent_field(&store, id, "averageCost").await, None);
    }

    #[tokio::test]
    async fn moving_a_course_updates_both_parents() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let a = bootcamp(&store).await;
        let other = store.insert(Collection::Bootcamps, doc(json!({ "name": "Other" }))).await.unwrap();
        let b = id_of(&other).unwrap();
        add_child(&store, Collection::Courses, json!({ "bootcamp": a.to_string(), "tuition": 100 })).await;
        let moving = add_child(&store, Collection::Courses, json!({ "bootcamp": a.to_string(), "tuition": 300 })).await;

        let observer = DerivedAggregate::average_cost();
        observer.recompute_aggregate(store.as_ref(), a).await.unwrap();
        assert_eq!(parent_field(&store, a, "averageCost").await, Some(json!(200)));

        let after = store
            .update_by_id(Collection::Courses, id_of(&moving).unwrap(), doc(json!({ "bootcamp": b.to_string() })))
            .await
            .unwrap()
            .unwrap();
        observer
            .execute(&ObserverContext::new(ChangeEvent::updated(Collection::Courses, moving, after), store.clone()))
            .await
            .unwrap();
        assert_eq!(parent_field(&store, a, "averageCost").await, Some(json!(100)));
        assert_eq!(parent_field(&store, b, "averageCost").await, Some(json!(300)));
    }

    #[tokio::test]
    async fn missing_parent_is_not_an_error() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let value = DerivedAggregate::average_cost()
            .recompute_aggregate(store.as_ref(), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_recomputes_converge() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let id = bootcamp(&store).await;
        let observer = Arc::new(DerivedAggregate::average_cost());

        let tasks = (1..=20).map(|i| {
            let store = store.clone();
            let observer = observer.clone();
            async move {
                let course = add_child(&store, Collection::Courses, json!({ "bootcamp": id.to_string(), "tuition": i * 100 })).await;
                let ctx = ObserverContext::new(ChangeEvent::created(Collection::Courses, course), store.clone());
                observer.execute(&ctx).await
            }
        });
        for result in join_all(tasks).await {
            result.unwrap();
        }

        // mean of 100..=2000 step 100 is 1050
        assert_eq!(parent_field(&store, id, "averageCost").await, Some(json!(1050)));
        assert_eq!(observer.held_locks(), 0);
    }

    #[tokio::test]
    async fn cancelled_recompute_releases_its_lock_entry() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let id = bootcamp(&store).await;
        let observer = DerivedAggregate::average_cost();

        let held = observer.lock_for(id);
        let serial = held.serial.lock().await;
        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            observer.recompute_aggregate(store.as_ref(), id),
        )
        .await;
        assert!(waited.is_err());
        assert_eq!(observer.held_locks(), 1);

        drop(serial);
        drop(held);
        assert_eq!(observer.held_locks(), 0);

        observer.recompute_aggregate(store.as_ref(), id).await.unwrap();
        assert_eq!(observer.held_locks(), 0);
    }
}
