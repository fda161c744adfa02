use std::time::Duration;

use async_trait::async_trait;

use crate::observer::context::{ChangeEvent, ObserverContext};
use crate::observer::error::ObserverError;

/// Reacts to confirmed writes. The pipeline only calls `execute` for events the
/// observer `watches`.
#[async_trait]
pub trait Observer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this change concerns the observer at all
    fn watches(&self, event: &ChangeEvent) -> bool;

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Lower runs first
    fn priority(&self) -> u8 {
        50
    }

    async fn execute(&self, ctx: &ObserverContext) -> Result<(), ObserverError>;
}
