//! Prometheus-compatible metrics backend client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::instrument;

use crate::capabilities::MetricsSource;
use crate::error::{HealthError, HealthResult};

/// Instant-query client for a Prometheus HTTP API.
pub struct PrometheusClient {
    client: Client,
    base_url: String,
    liveness_path: String,
}

impl PrometheusClient {
    pub fn new(
        base_url: impl Into<String>,
        liveness_path: impl Into<String>,
        timeout: Duration,
    ) -> HealthResult<Self> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(HealthError::Configuration("metrics base url is empty".to_string()));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            liveness_path: liveness_path.into(),
        })
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    #[instrument(skip(self))]
    async fn query_scalar(&self, query: &str) -> HealthResult<f64> {
        let payload: serde_json::Value = self
            .client
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_instant_scalar(&payload)
    }

    async fn is_live(&self) -> HealthResult<bool> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, self.liveness_path))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

/// Extract the first sample value of an instant-query response.
///
/// Accepts both `vector` results (`data.result[0].value[1]`) and `scalar`
/// results (`data.result[1]`). An empty vector reads as zero.
pub fn parse_instant_scalar(payload: &serde_json::Value) -> HealthResult<f64> {
    if payload["status"] != "success" {
        return Err(HealthError::InvalidMetricsPayload(format!(
            "query status {}",
            payload["status"]
        )));
    }

    let data = &payload["data"];
    let raw = match data["resultType"].as_str() {
        Some("vector") => {
            let samples = data["result"].as_array().ok_or_else(|| {
                HealthError::InvalidMetricsPayload("vector result is not an array".to_string())
            })?;
            match samples.first() {
                None => return Ok(0.0),
                Some(sample) => &sample["value"][1],
            }
        }
        Some("scalar") => &data["result"][1],
        other => {
            return Err(HealthError::InvalidMetricsPayload(format!(
                "unsupported result type {:?}",
                other
            )))
        }
    };

    let text = raw
        .as_str()
        .ok_or_else(|| HealthError::InvalidMetricsPayload("missing sample value".to_string()))?;

    let value: f64 = text
        .parse()
        .map_err(|_| HealthError::InvalidMetricsPayload(format!("not a number: {}", text)))?;

    // Prometheus renders divisions by zero as NaN
    if value.is_finite() {
        Ok(value)
    } else {
        Ok(0.0)
    }
}
