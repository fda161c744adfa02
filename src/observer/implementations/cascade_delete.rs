// Removes dependent children after their parent is deleted
use std::time::Duration;

use async_trait::async_trait;

use crate::filter::Condition;
use crate::observer::context::{ChangeEvent, ObserverContext};
use crate::observer::error::ObserverError;
use crate::observer::traits::Observer;
use crate::types::{Collection, Operation};

pub struct CascadeDelete {
    parent: Collection,
    children: &'static [Collection],
    /// Reference field on each child pointing at the parent
    foreign_field: &'static str,
    timeout: Duration,
}

impl CascadeDelete {
    /// Deleting a bootcamp deletes its courses and reviews
    pub fn bootcamp_children() -> Self {
        Self {
            parent: Collection::Bootcamps,
            children: &[Collection::Courses, Collection::Reviews],
            foreign_field: "bootcamp",
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Observer for CascadeDelete {
    fn name(&self) -> &'static str {
        "CascadeDelete"
    }

    fn watches(&self, event: &ChangeEvent) -> bool {
        event.operation == Operation::Delete && event.collection == self.parent
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &ObserverContext) -> Result<(), ObserverError> {
        let parent_id = ctx
            .event
            .before
            .as_ref()
            .and_then(crate::database::document::id_of)
            .ok_or_else(|| ObserverError::ValidationError("Deleted document has no _id".to_string()))?;

        for child in self.children {
            let removed = ctx
                .store
                .delete_many(*child, &[Condition::eq(self.foreign_field, parent_id.to_string())])
                .await?;
            tracing::info!("Removed {} {} of {} {}", removed, child, self.parent, parent_id);
        }
        Ok(())
    }
}
