//! Incident store.
//!
//! The store is the single writer of incident state. Every status change,
//! root cause, recovery attempt and narrative entry goes through it, lands on
//! the incident timeline and is published on the event bus. Events are
//! published after the lock is released so bus handlers may read the store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use healwatch_bus::EventBus;
use healwatch_types::{
    AnomalyReport, EventType, Incident, IncidentId, IncidentReport, IncidentStatus,
    RecoveryAttempt, TimelineEvent,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{IncidentError, IncidentResult};

#[derive(Default)]
struct Inner {
    incidents: HashMap<IncidentId, Incident>,
    /// Creation order.
    order: Vec<IncidentId>,
}

/// In-memory owner of all incident records.
pub struct IncidentStore {
    inner: RwLock<Inner>,
    bus: Arc<EventBus>,
}

impl IncidentStore {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            bus,
        }
    }

    /// Open a new incident in `detected` state.
    pub fn create(&self, anomaly: &AnomalyReport) -> Incident {
        let mut incident = Incident::from_anomaly(anomaly);
        incident.timeline.push(TimelineEvent::new(
            format!("Incident detected: {}", anomaly.description),
            Some(json!({
                "failure_type": anomaly.failure_type,
                "severity": anomaly.severity,
                "evidence": anomaly.evidence,
            })),
        ));

        {
            let mut inner = self.inner.write();
            inner.order.push(incident.id.clone());
            inner.incidents.insert(incident.id.clone(), incident.clone());
        }

        info!(
            incident_id = %incident.id,
            failure_type = %incident.failure_type,
            severity = %incident.severity,
            "Incident created"
        );
        self.bus
            .publish(EventType::IncidentCreated, incident_payload(&incident));
        incident
    }

    pub fn get(&self, id: &IncidentId) -> Option<Incident> {
        self.inner.read().incidents.get(id).cloned()
    }

    /// All incidents in creation order.
    pub fn list(&self) -> Vec<Incident> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.incidents.get(id).cloned())
            .collect()
    }

    /// The non-terminal incident, if any.
    pub fn active(&self) -> Option<Incident> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.incidents.get(id))
            .find(|incident| incident.is_active())
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.read().incidents.len()
    }

    /// Move an incident to `next`, returning the previous status.
    ///
    /// Entering `resolved` also stamps the resolution time.
    pub fn try_transition(
        &self,
        id: &IncidentId,
        next: IncidentStatus,
    ) -> IncidentResult<IncidentStatus> {
        self.transition_with_note(id, next, None)
    }

    /// Transition with an optional timeline note, written only if the move is allowed.
    fn transition_with_note(
        &self,
        id: &IncidentId,
        next: IncidentStatus,
        note: Option<String>,
    ) -> IncidentResult<IncidentStatus> {
        let (previous, snapshot) = self.mutate(id, |incident| {
            let previous = incident.status;
            if !previous.can_transition_to(next) {
                return Err(IncidentError::InvalidTransition {
                    id: incident.id.clone(),
                    from: previous,
                    to: next,
                });
            }

            if let Some(note) = note {
                incident.timeline.push(TimelineEvent::new(note, None));
            }
            incident.status = next;
            if next == IncidentStatus::Resolved {
                incident.resolved_at = Some(Utc::now());
            }
            incident.timeline.push(TimelineEvent::new(
                format!("Status changed: {} -> {}", previous, next),
                None,
            ));
            Ok((previous, incident.clone()))
        })?;

        info!(incident_id = %id, from = %previous, to = %next, "Incident transitioned");
        if next == IncidentStatus::Resolved {
            self.bus
                .publish(EventType::IncidentResolved, incident_payload(&snapshot));
        } else {
            self.bus.publish(
                EventType::IncidentUpdate,
                json!({
                    "incident_id": id.to_string(),
                    "change": "status",
                    "from": previous,
                    "status": next,
                }),
            );
        }
        Ok(previous)
    }

    /// Lenient form of [`try_transition`](Self::try_transition).
    ///
    /// Unknown ids are ignored and rejected transitions are logged; returns
    /// whether the status changed.
    pub fn transition(&self, id: &IncidentId, next: IncidentStatus) -> bool {
        applied(self.try_transition(id, next))
    }

    pub fn set_root_cause(&self, id: &IncidentId, root_cause: impl Into<String>) -> bool {
        let root_cause = root_cause.into();
        let updated = self.mutate(id, |incident| {
            incident.root_cause = Some(root_cause.clone());
            incident.timeline.push(TimelineEvent::new(
                format!("Root cause identified: {}", root_cause),
                None,
            ));
            Ok(())
        });

        if updated.is_err() {
            return false;
        }
        self.bus.publish(
            EventType::IncidentUpdate,
            json!({
                "incident_id": id.to_string(),
                "change": "root_cause",
                "root_cause": root_cause,
            }),
        );
        true
    }

    /// Append a recovery attempt and publish its outcome.
    pub fn record_attempt(&self, id: &IncidentId, attempt: RecoveryAttempt) -> bool {
        let outcome = if attempt.success { "succeeded" } else { "failed" };
        let message = match &attempt.error {
            Some(error) => format!("Recovery action {} {}: {}", attempt.action, outcome, error),
            None => format!("Recovery action {} {}", attempt.action, outcome),
        };

        let updated = self.mutate(id, |incident| {
            incident.attempted_actions.push(attempt.clone());
            incident.timeline.push(TimelineEvent::new(message, None));
            Ok(())
        });
        if updated.is_err() {
            return false;
        }

        debug!(
            incident_id = %id,
            action = %attempt.action,
            success = attempt.success,
            "Attempt recorded"
        );
        let payload = json!({
            "incident_id": id.to_string(),
            "attempt": attempt,
        });
        self.bus.publish(EventType::RecoveryAction, payload.clone());
        let outcome_event = if attempt.success {
            EventType::RecoverySuccess
        } else {
            EventType::RecoveryFailed
        };
        self.bus.publish(outcome_event, payload);
        true
    }

    /// Append a narrative entry to the timeline.
    pub fn add_timeline(
        &self,
        id: &IncidentId,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> bool {
        let entry = TimelineEvent::new(message, details);
        let updated = self.mutate(id, |incident| {
            incident.timeline.push(entry.clone());
            Ok(())
        });
        if updated.is_err() {
            return false;
        }

        self.bus.publish(
            EventType::IncidentUpdate,
            json!({
                "incident_id": id.to_string(),
                "change": "timeline",
                "entry": entry,
            }),
        );
        true
    }

    pub fn resolve(&self, id: &IncidentId) -> bool {
        self.transition(id, IncidentStatus::Resolved)
    }

    /// Mark an incident as unrecoverable.
    ///
    /// Terminal incidents are left untouched, timeline included.
    pub fn fail(&self, id: &IncidentId, reason: &str) -> bool {
        let note = format!("Incident failed: {}", reason);
        applied(self.transition_with_note(id, IncidentStatus::Failed, Some(note)))
    }

    /// Attach the terminal report; later reports are ignored.
    pub fn attach_report(&self, id: &IncidentId, report: IncidentReport) -> bool {
        let report_id = report.id.clone();
        let result = self.mutate(id, |incident| {
            if incident.report.is_some() {
                return Err(IncidentError::AlreadyReported(incident.id.clone()));
            }
            incident.report = Some(report);
            incident.timeline.push(TimelineEvent::new(
                format!("Report {} attached", report_id),
                None,
            ));
            Ok(())
        });

        match result {
            Ok(()) => {
                self.bus.publish(
                    EventType::IncidentUpdate,
                    json!({
                        "incident_id": id.to_string(),
                        "change": "report",
                        "report_id": report_id.to_string(),
                    }),
                );
                true
            }
            Err(IncidentError::NotFound(_)) => false,
            Err(e) => {
                warn!(error = %e, "Report ignored");
                false
            }
        }
    }

    fn mutate<R>(
        &self,
        id: &IncidentId,
        f: impl FnOnce(&mut Incident) -> IncidentResult<R>,
    ) -> IncidentResult<R> {
        let mut inner = self.inner.write();
        let incident = inner
            .incidents
            .get_mut(id)
            .ok_or_else(|| IncidentError::NotFound(id.clone()))?;
        f(incident)
    }
}

fn applied(result: IncidentResult<IncidentStatus>) -> bool {
    match result {
        Ok(_) => true,
        Err(IncidentError::NotFound(_)) => false,
        Err(e) => {
            warn!(error = %e, "Transition rejected");
            false
        }
    }
}

fn incident_payload(incident: &Incident) -> Value {
    serde_json::to_value(incident).unwrap_or_else(|_| json!({ "id": incident.id.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use healwatch_types::{FailureType, Severity};

    fn store() -> (IncidentStore, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        (IncidentStore::new(bus.clone()), bus)
    }

    fn anomaly() -> AnomalyReport {
        AnomalyReport::new(FailureType::MemoryLeak, Severity::Medium, "memory high")
            .with_service("demo-app")
    }

    #[test]
    fn test_create_opens_detected_incident() {
        let (store, bus) = store();
        let incident = store.create(&anomaly());

        assert_eq!(incident.status, IncidentStatus::Detected);
        assert_eq!(incident.timeline.len(), 1);
        assert_eq!(store.count(), 1);
        assert_eq!(store.active().unwrap().id, incident.id);
        assert_eq!(bus.history_by_type(EventType::IncidentCreated, 10).len(), 1);
    }

    #[test]
    fn test_forward_transitions_and_resolution() {
        let (store, bus) = store();
        let id = store.create(&anomaly()).id;

        assert!(store.transition(&id, IncidentStatus::Analyzing));
        assert!(store.transition(&id, IncidentStatus::Healing));
        assert!(store.get(&id).unwrap().resolved_at.is_none());
        assert!(store.resolve(&id));

        let incident = store.get(&id).unwrap();
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert!(incident.resolved_at.is_some());
        assert!(store.active().is_none());
        assert_eq!(bus.history_by_type(EventType::IncidentResolved, 10).len(), 1);
        assert_eq!(bus.history_by_type(EventType::IncidentUpdate, 10).len(), 2);
    }

    #[test]
    fn test_rejected_transition_is_noop() {
        let (store, _bus) = store();
        let id = store.create(&anomaly()).id;
        store.transition(&id, IncidentStatus::Healing);

        assert!(!store.transition(&id, IncidentStatus::Analyzing));
        assert!(matches!(
            store.try_transition(&id, IncidentStatus::Detected),
            Err(IncidentError::InvalidTransition { .. })
        ));
        assert_eq!(store.get(&id).unwrap().status, IncidentStatus::Healing);

        store.fail(&id, "gave up");
        assert!(!store.resolve(&id));
        assert_eq!(store.get(&id).unwrap().status, IncidentStatus::Failed);
    }

    #[test]
    fn test_fail_leaves_terminal_incident_untouched() {
        let (store, bus) = store();
        let id = store.create(&anomaly()).id;
        assert!(store.resolve(&id));
        let before = store.get(&id).unwrap().timeline.len();
        let events = bus.len();

        assert!(!store.fail(&id, "pipeline ended without resolution"));

        let incident = store.get(&id).unwrap();
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert_eq!(incident.timeline.len(), before);
        assert!(incident
            .timeline
            .iter()
            .all(|entry| !entry.message.starts_with("Incident failed")));
        assert_eq!(bus.len(), events);
    }

    #[test]
    fn test_fail_records_reason_then_status() {
        let (store, _bus) = store();
        let id = store.create(&anomaly()).id;

        assert!(store.fail(&id, "gave up"));

        let incident = store.get(&id).unwrap();
        assert_eq!(incident.status, IncidentStatus::Failed);
        let messages: Vec<_> = incident.timeline.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            &messages[1..],
            &["Incident failed: gave up", "Status changed: detected -> failed"]
        );
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let (store, bus) = store();
        let unknown = IncidentId::generate();
        let before = bus.len();

        assert!(!store.transition(&unknown, IncidentStatus::Analyzing));
        assert!(!store.set_root_cause(&unknown, "anything"));
        assert!(!store.add_timeline(&unknown, "note", None));
        assert!(!store.record_attempt(
            &unknown,
            RecoveryAttempt::success("restart_service", "demo-app", Utc::now())
        ));
        assert!(!store.fail(&unknown, "reason"));
        assert_eq!(bus.len(), before);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_record_attempt_appends_and_publishes_outcome() {
        let (store, bus) = store();
        let id = store.create(&anomaly()).id;

        store.record_attempt(
            &id,
            RecoveryAttempt::failure("restart_service", "demo-app", Utc::now(), "refused"),
        );
        store.record_attempt(
            &id,
            RecoveryAttempt::success("disaster_recovery", "demo-app", Utc::now()),
        );

        let incident = store.get(&id).unwrap();
        assert_eq!(incident.attempted_actions.len(), 2);
        assert!(!incident.attempted_actions[0].success);
        assert_eq!(incident.timeline.len(), 3);
        assert_eq!(bus.history_by_type(EventType::RecoveryAction, 10).len(), 2);
        assert_eq!(bus.history_by_type(EventType::RecoveryFailed, 10).len(), 1);
        assert_eq!(bus.history_by_type(EventType::RecoverySuccess, 10).len(), 1);
    }

    #[test]
    fn test_list_keeps_creation_order() {
        let (store, _bus) = store();
        let first = store.create(&anomaly()).id;
        store.resolve(&first);
        let second = store.create(&anomaly()).id;

        let ids: Vec<_> = store.list().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![first, second.clone()]);
        assert_eq!(store.active().unwrap().id, second);
    }

    #[test]
    fn test_handlers_can_read_store_during_publish() {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(IncidentStore::new(bus.clone()));
        let observer = store.clone();
        bus.subscribe(move |_event| {
            let _ = observer.count();
            Ok(())
        });

        let id = store.create(&anomaly()).id;
        assert!(store.transition(&id, IncidentStatus::Analyzing));
    }
}
