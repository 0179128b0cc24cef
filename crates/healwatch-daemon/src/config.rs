//! Daemon configuration

use std::net::SocketAddr;
use std::time::Duration;

use healwatch_agents::PipelineTimings;
use healwatch_control::OrchestratorConfig;
use healwatch_health::{MetricQueries, ProberConfig, ServiceEndpoints, DEFAULT_SERVICE_NAME};
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, DaemonResult};

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Monitored service
    #[serde(default)]
    pub target: TargetConfig,

    /// Monitoring backend
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Polling loop
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    /// Recovery pipeline delays
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// The monitored service and its health, reset and chaos endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_target_url")]
    pub base_url: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_reset_path")]
    pub reset_path: String,

    /// Prefix; the chaos kind is appended as the last path segment.
    #[serde(default = "default_chaos_path")]
    pub chaos_path: String,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            base_url: default_target_url(),
            health_path: default_health_path(),
            reset_path: default_reset_path(),
            chaos_path: default_chaos_path(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl TargetConfig {
    pub fn endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints {
            base_url: self.base_url.clone(),
            health_path: self.health_path.clone(),
            reset_path: self.reset_path.clone(),
            chaos_path: self.chaos_path.clone(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Monitoring backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_url")]
    pub base_url: String,

    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,

    #[serde(default)]
    pub queries: MetricQueries,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_url: default_metrics_url(),
            liveness_path: default_liveness_path(),
            queries: MetricQueries::default(),
        }
    }
}

/// Polling loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Consecutive anomalous polls before an incident opens
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: u32,

    /// Start polling as soon as the daemon is up
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Number of events the bus retains
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            unhealthy_threshold: default_unhealthy_threshold(),
            auto_start: true,
            history_capacity: default_history_capacity(),
        }
    }
}

impl OrchestratorSettings {
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            unhealthy_threshold: self.unhealthy_threshold.max(1),
        }
    }
}

/// Simulated remediation delays, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_observability_delay_ms")]
    pub observability_delay_ms: u64,

    #[serde(default = "default_healing_stabilization_ms")]
    pub healing_stabilization_ms: u64,

    #[serde(default = "default_dr_initial_wait_ms")]
    pub dr_initial_wait_ms: u64,

    #[serde(default = "default_dr_check_interval_ms")]
    pub dr_check_interval_ms: u64,

    #[serde(default = "default_traffic_stabilization_ms")]
    pub traffic_stabilization_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            observability_delay_ms: default_observability_delay_ms(),
            healing_stabilization_ms: default_healing_stabilization_ms(),
            dr_initial_wait_ms: default_dr_initial_wait_ms(),
            dr_check_interval_ms: default_dr_check_interval_ms(),
            traffic_stabilization_ms: default_traffic_stabilization_ms(),
        }
    }
}

impl PipelineConfig {
    /// Stage timings; stage health checks share the probe timeout.
    pub fn timings(&self, health_check_timeout: Duration) -> PipelineTimings {
        PipelineTimings {
            observability_delay: Duration::from_millis(self.observability_delay_ms),
            healing_stabilization: Duration::from_millis(self.healing_stabilization_ms),
            dr_initial_wait: Duration::from_millis(self.dr_initial_wait_ms),
            dr_check_interval: Duration::from_millis(self.dr_check_interval_ms),
            traffic_stabilization: Duration::from_millis(self.traffic_stabilization_ms),
            health_check_timeout,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7070))
}

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_target_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_reset_path() -> String {
    "/chaos/reset".to_string()
}

fn default_chaos_path() -> String {
    "/chaos".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_metrics_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_liveness_path() -> String {
    "/-/healthy".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_unhealthy_threshold() -> u32 {
    healwatch_control::DEFAULT_UNHEALTHY_THRESHOLD
}

fn default_history_capacity() -> usize {
    healwatch_bus::DEFAULT_HISTORY_CAPACITY
}

fn default_observability_delay_ms() -> u64 {
    500
}

fn default_healing_stabilization_ms() -> u64 {
    3000
}

fn default_dr_initial_wait_ms() -> u64 {
    5000
}

fn default_dr_check_interval_ms() -> u64 {
    2000
}

fn default_traffic_stabilization_ms() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `HEALWATCH_*`
    /// variables (`HEALWATCH_TARGET__BASE_URL` sets `target.base_url`).
    pub fn load(path: Option<&str>) -> DaemonResult<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&DaemonConfig::default())
                .map_err(|e| DaemonError::Config(e.to_string()))?,
        );

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("HEALWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DaemonError::Config(e.to_string()))
    }

    pub fn prober_config(&self) -> ProberConfig {
        ProberConfig {
            service_name: self.target.service_name.clone(),
            probe_timeout: self.target.probe_timeout(),
            queries: self.metrics.queries.clone(),
        }
    }

    pub fn pipeline_timings(&self) -> PipelineTimings {
        self.pipeline.timings(self.target.probe_timeout())
    }
}
