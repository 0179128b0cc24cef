//! # healwatch health
//!
//! Health probing and anomaly classification for the monitored service.
//!
//! ## Key Components
//!
//! - [`HealthProber`]: concurrent snapshot of reachability, platform liveness
//!   and five scalar metrics
//! - [`classify`]: ordered threshold rules turning a snapshot into at most one
//!   [`AnomalyReport`](healwatch_types::AnomalyReport)
//! - [`capabilities`]: contracts of the external collaborators
//! - [`http`]: reqwest-backed collaborator implementations
//! - [`fakes`]: scripted collaborators for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use healwatch_bus::EventBus;
//! use healwatch_health::{classify, HealthProber, ProberConfig};
//! use healwatch_health::fakes::{ScriptedService, StaticMetrics};
//!
//! # async fn example() {
//! let bus = Arc::new(EventBus::new());
//! let prober = HealthProber::new(
//!     Arc::new(ScriptedService::unreachable()),
//!     Arc::new(StaticMetrics::new()),
//!     bus,
//!     ProberConfig::default(),
//! );
//!
//! let snapshot = prober.snapshot().await;
//! if let Some(anomaly) = classify(&prober.config().service_name, &snapshot) {
//!     println!("{}: {}", anomaly.failure_type, anomaly.description);
//! }
//! # }
//! ```

pub mod capabilities;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fakes;
pub mod http;
mod prober;

pub use capabilities::{
    ChaosInjector, MetricsSource, ProbeResponse, RemediationAck, RemediationTarget, ServiceProbe,
};
pub use classifier::classify;
pub use config::{MetricQueries, ProberConfig, DEFAULT_PROBE_TIMEOUT, DEFAULT_SERVICE_NAME};
pub use error::{HealthError, HealthResult};
pub use http::{HttpServiceClient, PrometheusClient, ServiceEndpoints};
pub use prober::HealthProber;
