//! # healwatch agents
//!
//! The staged recovery pipeline. Seven agents run in a fixed order, each one
//! reading and writing the incident through the
//! [`IncidentStore`](healwatch_incident::IncidentStore):
//!
//! 1. [`ObservabilityAgent`]: packages evidence and the snapshot
//! 2. [`AnalyzerAgent`]: root cause and fix strategy lookup
//! 3. [`SelfHealingAgent`]: reset, stabilize, re-check
//! 4. [`RecoveryDecisionAgent`]: resolve or escalate
//! 5. [`DisasterRecoveryAgent`]: restore and bounded re-checks (escalation only)
//! 6. [`TrafficSwitchAgent`]: final verification (escalation only)
//! 7. [`ReporterAgent`]: report, recommendations, resolution
//!
//! Every stage goes through [`run_stage`], which never lets a stage failure
//! abort the pipeline.

mod agents;
mod context;
mod error;
pub mod playbook;
mod stage;

pub use agents::{
    Analysis, AnalyzerAgent, Decision, DisasterRecoveryAgent, DrOutcome, Finding,
    HealingOutcome, ObservabilityAgent, RecoveryAgents, RecoveryDecisionAgent, ReporterAgent,
    SelfHealingAgent, TrafficOutcome, TrafficState, TrafficSwitchAgent, Verdict,
};
pub use context::{AgentContext, PipelineTimings, DR_HEALTH_CHECKS};
pub use error::{AgentError, AgentResult};
pub use playbook::{Confidence, FixStrategy};
pub use stage::{run_stage, AgentKind, StageOutput, StageResult};
