use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::database::store::SharedStore;
use crate::observer::context::{ChangeEvent, ObserverContext};
use crate::observer::error::{ObserverError, ObserverResult};
use crate::observer::implementations::{CascadeDelete, DerivedAggregate};
use crate::observer::traits::Observer;

/// Runs registered observers, in priority order, after every confirmed write.
/// Failures and timeouts are logged and collected, never propagated.
pub struct ObserverPipeline {
    store: SharedStore,
    observers: Vec<Box<dyn Observer>>,
}

impl ObserverPipeline {
    /// Empty pipeline; observers are added with `register_observer`
    pub fn new(store: SharedStore) -> Self {
        Self { store, observers: Vec::new() }
    }

    /// Pipeline with the cascade and both bootcamp aggregates registered
    pub fn with_defaults(store: SharedStore, observer_timeout: Duration) -> Self {
        let mut pipeline = Self::new(store);
        pipeline.register_observer(Box::new(CascadeDelete::bootcamp_children().with_timeout(observer_timeout)));
        pipeline.register_observer(Box::new(DerivedAggregate::average_cost().with_timeout(observer_timeout)));
        pipeline.register_observer(Box::new(DerivedAggregate::average_rating().with_timeout(observer_timeout)));
        pipeline
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer>) {
        tracing::debug!("Registered observer '{}' (priority {})", observer.name(), observer.priority());
        self.observers.push(observer);
        self.observers.sort_by_key(|o| o.priority());
    }

    pub fn observer_names(&self) -> Vec<&'static str> {
        self.observers.iter().map(|o| o.name()).collect()
    }

    /// Notify every applicable observer of a change
    pub async fn notify(&self, event: ChangeEvent) -> ObserverResult {
        let start_time = Instant::now();
        let ctx = ObserverContext::new(event, self.store.clone());
        let mut result = ObserverResult::default();

        for observer in &self.observers {
            if !observer.watches(&ctx.event) {
                tracing::trace!(
                    "Observer {} skipped for {:?} on {}",
                    observer.name(),
                    ctx.event.operation,
                    ctx.event.collection
                );
                continue;
            }

            let observer_start = Instant::now();
            match timeout(observer.timeout(), observer.execute(&ctx)).await {
                Ok(Ok(())) => {
                    tracing::debug!("Observer: {} completed in {:?}", observer.name(), observer_start.elapsed());
                    result.executed.push(observer.name());
                }
                Ok(Err(error)) => {
                    tracing::warn!("Observer: {} failed in {:?}: {}", observer.name(), observer_start.elapsed(), error);
                    result.errors.push(error);
                }
                Err(_elapsed) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    result.errors.push(ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    )));
                }
            }
        }

        result.execution_time = start_time.elapsed();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::types::{Collection, Operation};

    struct Failing;

    #[async_trait]
    impl Observer for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }
        fn watches(&self, _event: &ChangeEvent) -> bool {
            true
        }
        fn priority(&self) -> u8 {
            1
        }
        async fn execute(&self, _ctx: &ObserverContext) -> Result<(), ObserverError> {
            Err(ObserverError::SystemError("boom".to_string()))
        }
    }

    struct Slow;

    #[async_trait]
    impl Observer for Slow {
        fn name(&self) -> &'static str {
            "Slow"
        }
        fn watches(&self, event: &ChangeEvent) -> bool {
            event.operation == Operation::Create && event.collection == Collection::Courses
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(10)
        }
        async fn execute(&self, _ctx: &ObserverContext) -> Result<(), ObserverError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    fn course() -> ChangeEvent {
        ChangeEvent::created(Collection::Courses, json!({ "title": "Web" }).as_object().unwrap().clone())
    }

    #[tokio::test]
    async fn failures_and_timeouts_are_collected() {
        let mut pipeline = ObserverPipeline::new(Arc::new(MemoryStore::new()));
        pipeline.register_observer(Box::new(Slow));
        pipeline.register_observer(Box::new(Failing));
        assert_eq!(pipeline.observer_names(), vec!["Failing", "Slow"]);

        let result = pipeline.notify(course()).await;
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(result.errors[0], ObserverError::SystemError(_)));
        assert!(matches!(result.errors[1], ObserverError::TimeoutError(_)));
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn skips_observers_that_do_not_apply() {
        let mut pipeline = ObserverPipeline::new(Arc::new(MemoryStore::new()));
        pipeline.register_observer(Box::new(Slow));
        let event = ChangeEvent::created(Collection::Reviews, json!({}).as_object().unwrap().clone());
        let result = pipeline.notify(event).await;
        assert!(result.is_success());
        assert!(result.executed.is_empty());
    }

    #[test]
    fn defaults_register_cascade_first() {
        let pipeline = ObserverPipeline::with_defaults(Arc::new(MemoryStore::new()), Duration::from_secs(1));
        let names = pipeline.observer_names();
        assert_eq!(names[0], "CascadeDelete");
        assert!(names.contains(&"AverageCost"));
        assert!(names.contains(&"AverageRating"));
    }
}
