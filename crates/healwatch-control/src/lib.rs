//! # healwatch control
//!
//! The [`Orchestrator`] polls the monitored service, debounces anomalies and
//! drives the recovery agents for confirmed ones.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use healwatch_agents::{AgentContext, PipelineTimings, RecoveryAgents};
//! use healwatch_bus::EventBus;
//! use healwatch_control::{Orchestrator, OrchestratorConfig};
//! use healwatch_health::fakes::{ScriptedService, StaticMetrics};
//! use healwatch_health::{HealthProber, ProberConfig};
//! use healwatch_incident::IncidentStore;
//!
//! # async fn example() {
//! let bus = Arc::new(EventBus::new());
//! let store = Arc::new(IncidentStore::new(bus.clone()));
//! let service = Arc::new(ScriptedService::healthy());
//!
//! let prober = HealthProber::new(
//!     service.clone(),
//!     Arc::new(StaticMetrics::new()),
//!     bus.clone(),
//!     ProberConfig::default(),
//! );
//! let agents = RecoveryAgents::new(Arc::new(AgentContext {
//!     bus,
//!     store,
//!     probe: service.clone(),
//!     remediation: service,
//!     timings: PipelineTimings::default(),
//!     service_name: "demo-app".to_string(),
//! }));
//!
//! let orchestrator = Orchestrator::new(prober, agents, OrchestratorConfig::default());
//! orchestrator.start();
//! println!("{:?}", orchestrator.status());
//! # }
//! ```

mod config;
mod error;
mod orchestrator;

pub use config::{OrchestratorConfig, DEFAULT_POLL_INTERVAL, DEFAULT_UNHEALTHY_THRESHOLD};
pub use error::{ControlError, ControlResult};
pub use orchestrator::{
    Orchestrator, OrchestratorStatus, PipelineSummary, PollOutcome, StageRecord,
};
