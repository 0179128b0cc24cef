//! Static remediation knowledge keyed by failure classification.

use std::fmt;
use std::str::FromStr;

use healwatch_types::FailureType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Remediation the Self-Healing agent is asked to perform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FixStrategy {
    RestartService,
    ClearCache,
    RestartDependencies,
    FailoverDatabase,
    /// A token the healer does not know how to execute.
    Other(String),
}

impl FixStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            FixStrategy::RestartService => "restart_service",
            FixStrategy::ClearCache => "clear_cache",
            FixStrategy::RestartDependencies => "restart_dependencies",
            FixStrategy::FailoverDatabase => "failover_database",
            FixStrategy::Other(token) => token,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FixStrategy::Other(_))
    }
}

impl fmt::Display for FixStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixStrategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "restart_service" => FixStrategy::RestartService,
            "clear_cache" => FixStrategy::ClearCache,
            "restart_dependencies" => FixStrategy::RestartDependencies,
            "failover_database" => FixStrategy::FailoverDatabase,
            other => FixStrategy::Other(other.to_string()),
        })
    }
}

impl Serialize for FixStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FixStrategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        match token.parse::<FixStrategy>() {
            Ok(strategy) => Ok(strategy),
            Err(never) => match never {},
        }
    }
}

/// How sure the analyzer is of its diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// One row of the diagnosis table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub root_cause: &'static str,
    pub category: &'static str,
    pub strategy: FixStrategy,
    pub confidence: Confidence,
}

/// Deterministic root-cause lookup for a failure classification.
pub fn diagnose(failure_type: FailureType) -> Diagnosis {
    match failure_type {
        FailureType::ServiceDown => Diagnosis {
            root_cause: "Application process crashed or stopped accepting connections",
            category: "application",
            strategy: FixStrategy::RestartService,
            confidence: Confidence::High,
        },
        FailureType::LatencySpike => Diagnosis {
            root_cause: "Request processing saturated by slow downstream calls or a cold cache",
            category: "performance",
            strategy: FixStrategy::ClearCache,
            confidence: Confidence::Medium,
        },
        FailureType::DependencyFailure => Diagnosis {
            root_cause: "A downstream dependency is returning errors to the application",
            category: "dependency",
            strategy: FixStrategy::RestartDependencies,
            confidence: Confidence::Medium,
        },
        FailureType::MemoryLeak => Diagnosis {
            root_cause: "Unbounded heap growth in the application process",
            category: "resource",
            strategy: FixStrategy::RestartService,
            confidence: Confidence::High,
        },
        FailureType::DatabaseFailure => Diagnosis {
            root_cause: "Primary database unavailable or connection pool exhausted",
            category: "database",
            strategy: FixStrategy::FailoverDatabase,
            confidence: Confidence::High,
        },
        FailureType::Unknown => Diagnosis {
            root_cause: "Root cause could not be determined from the available evidence",
            category: "unknown",
            strategy: FixStrategy::RestartService,
            confidence: Confidence::Low,
        },
    }
}

const BASELINE_RECOMMENDATIONS: [&str; 3] = [
    "Review alert thresholds so this condition pages before users notice",
    "Add a regression test or chaos experiment reproducing this failure",
    "Update the runbook with the remediation steps taken for this incident",
];

/// Prevention advice for a failure classification, followed by the baseline advice.
pub fn recommendations(failure_type: FailureType) -> Vec<String> {
    let specific: &[&str] = match failure_type {
        FailureType::ServiceDown => &[
            "Configure liveness probes with automatic restart",
            "Run at least two replicas behind the load balancer",
        ],
        FailureType::LatencySpike => &[
            "Set timeouts and circuit breakers on slow downstream calls",
            "Autoscale on p99 latency as well as CPU",
        ],
        FailureType::DependencyFailure => &[
            "Add retries with exponential backoff for dependency calls",
            "Degrade gracefully with cached or default responses",
        ],
        FailureType::MemoryLeak => &[
            "Profile heap allocations under production-like load",
            "Set container memory limits with alerting at 80% usage",
        ],
        FailureType::DatabaseFailure => &[
            "Enable automated failover to a standby replica",
            "Monitor connection pool saturation and slow queries",
        ],
        FailureType::Unknown => &["Improve telemetry coverage to classify similar failures"],
    };

    specific
        .iter()
        .chain(BASELINE_RECOMMENDATIONS.iter())
        .map(|s| s.to_string())
        .collect()
}
