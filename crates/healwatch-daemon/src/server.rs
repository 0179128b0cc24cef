//! Server setup and lifecycle management

use std::sync::Arc;

use healwatch_agents::{AgentContext, RecoveryAgents};
use healwatch_bus::EventBus;
use healwatch_control::Orchestrator;
use healwatch_health::{HealthProber, HttpServiceClient, PrometheusClient};
use healwatch_incident::IncidentStore;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::api::rest::{create_router, AppState};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};

/// healwatch daemon server
pub struct Server {
    config: DaemonConfig,
    orchestrator: Arc<Orchestrator>,
    target: Arc<HttpServiceClient>,
}

impl Server {
    /// Wire the bus, store, collaborators and orchestrator from configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let bus = Arc::new(EventBus::with_capacity(config.orchestrator.history_capacity));
        let store = Arc::new(IncidentStore::new(bus.clone()));

        let probe_timeout = config.target.probe_timeout();
        let target = Arc::new(HttpServiceClient::new(
            config.target.endpoints(),
            probe_timeout,
        )?);
        let metrics = Arc::new(PrometheusClient::new(
            config.metrics.base_url.clone(),
            config.metrics.liveness_path.clone(),
            probe_timeout,
        )?);

        let prober = HealthProber::new(
            target.clone(),
            metrics,
            bus.clone(),
            config.prober_config(),
        );
        let agents = RecoveryAgents::new(Arc::new(AgentContext {
            bus,
            store,
            probe: target.clone(),
            remediation: target.clone(),
            timings: config.pipeline_timings(),
            service_name: config.target.service_name.clone(),
        }));
        let orchestrator = Orchestrator::new(
            prober,
            agents,
            config.orchestrator.to_orchestrator_config(),
        );

        Ok(Self {
            config,
            orchestrator,
            target,
        })
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Serve the API until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.orchestrator.clone(), self.target.clone());
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;
        info!(
            %addr,
            target = %self.config.target.base_url,
            metrics = %self.config.metrics.base_url,
            "healwatch daemon listening"
        );

        if self.config.orchestrator.auto_start {
            self.orchestrator.start();
        }

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        info!("healwatch daemon shutting down");
        self.orchestrator.stop();

        result.map_err(DaemonError::Io)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
