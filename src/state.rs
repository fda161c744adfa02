use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::{MemoryStore, SharedStore};
use crate::geocoder::{self, Geocoder};
use crate::observer::ObserverPipeline;

/// Collaborators shared by every request. Built once at startup and injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
    pub pipeline: Arc<ObserverPipeline>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore, geocoder: Arc<dyn Geocoder>) -> Self {
        let timeout = Duration::from_millis(config.observer.timeout_ms);
        let pipeline = ObserverPipeline::with_defaults(store.clone(), timeout);
        Self {
            config: Arc::new(config),
            store,
            pipeline: Arc::new(pipeline),
            geocoder,
        }
    }

    /// State over a fresh in-memory store, with the geocoder the configuration asks for
    pub fn in_memory(config: AppConfig) -> Self {
        let geocoder: Arc<dyn Geocoder> = Arc::from(geocoder::from_config(&config.geocoder));
        Self::new(config, Arc::new(MemoryStore::new()), geocoder)
    }
}
