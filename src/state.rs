use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::callback::CallbackProcessor;
use crate::config::Config;
use crate::sync::{SchedulerControl, SyncService};

/// Shared handle passed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<SyncService>,
    pub control: Arc<SchedulerControl>,
    /// Absent when callback credentials are not configured; the callback
    /// routes then answer without processing.
    pub callbacks: Option<Arc<CallbackProcessor>>,
    /// Instant of the last manual sync trigger, for the 10-second
    /// throttle on the control plane.
    pub last_manual_trigger: Arc<Mutex<Option<Instant>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        service: Arc<SyncService>,
        control: Arc<SchedulerControl>,
        callbacks: Option<Arc<CallbackProcessor>>,
    ) -> Self {
        Self {
            config,
            service,
            control,
            callbacks,
            last_manual_trigger: Arc::new(Mutex::new(None)),
        }
    }
}
