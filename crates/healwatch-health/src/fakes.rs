//! Scripted collaborators for tests and offline runs.
//!
//! These stand in for the monitored service and the metrics backend so the
//! prober, the recovery agents and the orchestrator can be exercised without
//! network access.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::capabilities::{
    ChaosInjector, MetricsSource, ProbeResponse, RemediationAck, RemediationTarget, ServiceProbe,
};
use crate::error::{HealthError, HealthResult};

/// How the scripted service answers a single health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedHealth {
    /// 200 OK.
    Healthy,
    /// Connection refused.
    Unreachable,
    /// Answers with the given status code.
    Status(u16),
    /// Sleeps before failing; use with a shorter probe timeout.
    Hang(Duration),
}

/// A monitored service whose health answers follow a script.
///
/// Queued answers are consumed first; once the queue is empty every check
/// returns the fallback.
pub struct ScriptedService {
    script: Mutex<VecDeque<ScriptedHealth>>,
    fallback: Mutex<ScriptedHealth>,
    reset_succeeds: AtomicBool,
    recover_on_reset: AtomicBool,
    health_checks: AtomicUsize,
    resets: AtomicUsize,
    injected: Mutex<Vec<(String, Value)>>,
}

impl ScriptedService {
    pub fn new(fallback: ScriptedHealth) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            reset_succeeds: AtomicBool::new(true),
            recover_on_reset: AtomicBool::new(false),
            health_checks: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            injected: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ScriptedHealth::Healthy)
    }

    pub fn unreachable() -> Self {
        Self::new(ScriptedHealth::Unreachable)
    }

    /// Queue answers to be returned before the fallback.
    pub fn then(self, answers: impl IntoIterator<Item = ScriptedHealth>) -> Self {
        self.script.lock().extend(answers);
        self
    }

    /// Make every reset request fail at the transport level.
    pub fn with_failing_reset(self) -> Self {
        self.reset_succeeds.store(false, Ordering::SeqCst);
        self
    }

    /// A successful reset clears the script and makes the service healthy.
    pub fn recovering_on_reset(self) -> Self {
        self.recover_on_reset.store(true, Ordering::SeqCst);
        self
    }

    /// Replace the fallback answer and drop any queued answers.
    pub fn set_health(&self, health: ScriptedHealth) {
        self.script.lock().clear();
        *self.fallback.lock() = health;
    }

    pub fn health_check_count(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Chaos requests received so far, as `(kind, params)`.
    pub fn injected(&self) -> Vec<(String, Value)> {
        self.injected.lock().clone()
    }

    fn next_answer(&self) -> ScriptedHealth {
        let queued = self.script.lock().pop_front();
        queued.unwrap_or_else(|| *self.fallback.lock())
    }
}

#[async_trait]
impl ServiceProbe for ScriptedService {
    async fn check_health(&self) -> HealthResult<ProbeResponse> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);

        match self.next_answer() {
            ScriptedHealth::Healthy => Ok(ProbeResponse::from_status(200)),
            ScriptedHealth::Status(code) => Ok(ProbeResponse::from_status(code)),
            ScriptedHealth::Unreachable => {
                Err(HealthError::ProbeFailed("connection refused".to_string()))
            }
            ScriptedHealth::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(HealthError::ProbeTimeout {
                    timeout_ms: duration.as_millis() as u64,
                })
            }
        }
    }
}

#[async_trait]
impl RemediationTarget for ScriptedService {
    async fn reset(&self) -> HealthResult<RemediationAck> {
        self.resets.fetch_add(1, Ordering::SeqCst);

        if !self.reset_succeeds.load(Ordering::SeqCst) {
            return Err(HealthError::RemediationFailed("connection refused".to_string()));
        }

        if self.recover_on_reset.load(Ordering::SeqCst) {
            self.set_health(ScriptedHealth::Healthy);
        }

        Ok(RemediationAck {
            success: true,
            message: "reset accepted".to_string(),
        })
    }
}

#[async_trait]
impl ChaosInjector for ScriptedService {
    async fn inject(&self, kind: &str, params: Value) -> HealthResult<Value> {
        self.injected.lock().push((kind.to_string(), params));
        Ok(json!({ "status": 200, "body": { "injected": kind } }))
    }
}

/// A metrics backend answering from a fixed table.
///
/// Unknown queries evaluate to zero. In failing mode every query and the
/// liveness check return an error.
pub struct StaticMetrics {
    values: Mutex<HashMap<String, f64>>,
    failing: AtomicBool,
}

impl StaticMetrics {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let metrics = Self::new();
        metrics.failing.store(true, Ordering::SeqCst);
        metrics
    }

    pub fn with_value(self, query: &str, value: f64) -> Self {
        self.set(query, value);
        self
    }

    pub fn set(&self, query: &str, value: f64) {
        self.values.lock().insert(query.to_string(), value);
    }
}

impl Default for StaticMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for StaticMetrics {
    async fn query_scalar(&self, query: &str) -> HealthResult<f64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HealthError::InvalidMetricsPayload("backend unavailable".to_string()));
        }
        Ok(self.values.lock().get(query).copied().unwrap_or(0.0))
    }

    async fn is_live(&self) -> HealthResult<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HealthError::ProbeFailed("backend unavailable".to_string()));
        }
        Ok(true)
    }
}
