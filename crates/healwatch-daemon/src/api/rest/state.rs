//! Application state for API handlers

use std::sync::Arc;

use healwatch_bus::EventBus;
use healwatch_control::Orchestrator;
use healwatch_health::ChaosInjector;
use healwatch_incident::IncidentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Polling loop and pipeline driver
    pub orchestrator: Arc<Orchestrator>,

    /// Event bus shared with the orchestrator
    pub bus: Arc<EventBus>,

    /// Incident store shared with the orchestrator
    pub store: Arc<IncidentStore>,

    /// Fault injection into the monitored service
    pub chaos: Arc<dyn ChaosInjector>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state around a built orchestrator
    pub fn new(orchestrator: Arc<Orchestrator>, chaos: Arc<dyn ChaosInjector>) -> Self {
        Self {
            bus: orchestrator.bus().clone(),
            store: orchestrator.store().clone(),
            orchestrator,
            chaos,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds().max(0);

        match secs {
            s if s < 60 => format!("{}s", s),
            s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
            s if s < 86400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
            s => format!("{}d {}h", s / 86400, (s % 86400) / 3600),
        }
    }
}
