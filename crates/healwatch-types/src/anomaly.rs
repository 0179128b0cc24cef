//! Anomaly verdicts produced by the classifier.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure classification of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    ServiceDown,
    LatencySpike,
    DependencyFailure,
    MemoryLeak,
    DatabaseFailure,
    /// Anything the lookup tables do not recognise.
    Unknown,
}

impl FailureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::ServiceDown => "service_down",
            FailureType::LatencySpike => "latency_spike",
            FailureType::DependencyFailure => "dependency_failure",
            FailureType::MemoryLeak => "memory_leak",
            FailureType::DatabaseFailure => "database_failure",
            FailureType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anomaly severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A classifier verdict that a failure condition is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Failure classification.
    pub failure_type: FailureType,

    /// Severity of the anomaly.
    pub severity: Severity,

    /// Names of the services affected.
    pub affected_services: Vec<String>,

    /// Raw fields that triggered the verdict.
    pub evidence: BTreeMap<String, serde_json::Value>,

    /// Human readable description.
    pub description: String,
}

impl AnomalyReport {
    pub fn new(
        failure_type: FailureType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            failure_type,
            severity,
            affected_services: Vec::new(),
            evidence: BTreeMap::new(),
            description: description.into(),
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.affected_services.push(service.into());
        self
    }

    pub fn with_evidence(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_type_serializes_snake_case() {
        let json = serde_json::to_string(&FailureType::DependencyFailure).unwrap();
        assert_eq!(json, "\"dependency_failure\"");
        assert_eq!(FailureType::MemoryLeak.to_string(), "memory_leak");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
    }
}
