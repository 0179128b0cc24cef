//! Orchestrator configuration.

use std::time::Duration;

/// Consecutive anomalous polls needed before an incident is opened.
pub const DEFAULT_UNHEALTHY_THRESHOLD: u32 = 2;

/// Default spacing between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub unhealthy_threshold: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            unhealthy_threshold: DEFAULT_UNHEALTHY_THRESHOLD,
        }
    }
}
