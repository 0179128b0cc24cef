//! HTTP client for the monitored service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::capabilities::{
    ChaosInjector, ProbeResponse, RemediationAck, RemediationTarget, ServiceProbe,
};
use crate::error::{HealthError, HealthResult};

/// Where the monitored service exposes its health, reset and chaos endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub base_url: String,
    pub health_path: String,
    pub reset_path: String,
    pub chaos_path: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            health_path: "/health".to_string(),
            reset_path: "/chaos/reset".to_string(),
            chaos_path: "/chaos".to_string(),
        }
    }
}

/// reqwest-backed probe, remediation and chaos client.
pub struct HttpServiceClient {
    client: Client,
    endpoints: ServiceEndpoints,
}

impl HttpServiceClient {
    /// Create a client whose requests are bounded by `timeout`.
    pub fn new(endpoints: ServiceEndpoints, timeout: Duration) -> HealthResult<Self> {
        if endpoints.base_url.is_empty() {
            return Err(HealthError::Configuration("service base url is empty".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ServiceProbe for HttpServiceClient {
    #[instrument(skip(self), fields(url = %self.url(&self.endpoints.health_path)))]
    async fn check_health(&self) -> HealthResult<ProbeResponse> {
        let response = self
            .client
            .get(self.url(&self.endpoints.health_path))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        debug!(status = status.as_u16(), "Health endpoint answered");
        Ok(ProbeResponse {
            ok: status.is_success(),
            status_code: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemediationTarget for HttpServiceClient {
    #[instrument(skip(self))]
    async fn reset(&self) -> HealthResult<RemediationAck> {
        let response = self
            .client
            .post(self.url(&self.endpoints.reset_path))
            .send()
            .await
            .map_err(|e| HealthError::RemediationFailed(e.to_string()))?;

        let status = response.status();
        let message = response.text().await.unwrap_or_default();

        Ok(RemediationAck {
            success: status.is_success(),
            message: if message.is_empty() {
                format!("reset answered {}", status.as_u16())
            } else {
                message
            },
        })
    }
}

#[async_trait]
impl ChaosInjector for HttpServiceClient {
    #[instrument(skip(self, params))]
    async fn inject(
        &self,
        kind: &str,
        params: serde_json::Value,
    ) -> HealthResult<serde_json::Value> {
        let path = format!("{}/{}", self.endpoints.chaos_path.trim_end_matches('/'), kind);
        let response = self.client.post(self.url(&path)).json(&params).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));

        Ok(serde_json::json!({
            "status": status.as_u16(),
            "body": parsed,
        }))
    }
}
