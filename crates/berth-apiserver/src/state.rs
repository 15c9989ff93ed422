use berth_scheduler::{SchedulerConfig, SchedulingEngine};
use berth_storage::RedbBackend;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Record and queue storage
    pub storage: Arc<RedbBackend>,

    /// Scheduling engine, sharing `storage` for both records and queues
    pub engine: Arc<SchedulingEngine>,
}

impl AppState {
    /// Create a new AppState with the default scheduler config
    pub fn new(storage: Arc<RedbBackend>) -> Self {
        Self::with_scheduler_config(storage, SchedulerConfig::default())
    }

    /// Create a new AppState with a custom scheduler config
    pub fn with_scheduler_config(storage: Arc<RedbBackend>, config: SchedulerConfig) -> Self {
        let engine = SchedulingEngine::new(storage.clone(), storage.clone(), config);
        Self {
            storage,
            engine: Arc::new(engine),
        }
    }
}
