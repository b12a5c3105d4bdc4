//! Incident Manager
//!
//! Owns the incident store, drives the immediate response on creation, and
//! schedules cancellable escalation timers. Timer cancellation happens under
//! the same lock as the status mutation, and the timer task re-checks the
//! status under that lock before escalating, so a resolve and a firing timer
//! cannot race.

use crate::error::IncidentError;
use crate::incident::{
    Incident, IncidentSeverity, IncidentStatus, IncidentType, TimelineKind,
};
use crate::policy::{Contact, ContactDirectory, EscalationPolicy, PolicyMatrix};
use crate::runbook::{Runbook, RunbookLibrary};
use chrono::{DateTime, Duration, Utc};
use routing::Router;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct Store {
    incidents: HashMap<String, Incident>,
    /// Escalation timers keyed by incident id
    timers: HashMap<String, JoinHandle<()>>,
}

/// Aggregated incident figures for the query surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct IncidentMetrics {
    pub total: usize,
    pub open: usize,
    pub resolved: usize,
    pub avg_mtta_minutes: Option<f64>,
    pub avg_mttr_minutes: Option<f64>,
    pub by_severity: BTreeMap<IncidentSeverity, usize>,
}

/// Creates incidents and drives them through their lifecycle
pub struct IncidentManager {
    store: Arc<Mutex<Store>>,
    router: Arc<Router>,
    policies: PolicyMatrix,
    contacts: ContactDirectory,
    runbooks: Arc<RunbookLibrary>,
}

impl IncidentManager {
    /// Create a manager over the given configuration
    pub fn new(
        router: Arc<Router>,
        policies: PolicyMatrix,
        contacts: ContactDirectory,
        runbooks: RunbookLibrary,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                incidents: HashMap::new(),
                timers: HashMap::new(),
            })),
            router,
            policies,
            contacts,
            runbooks: Arc::new(runbooks),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, IncidentError> {
        self.store.lock().map_err(|_| IncidentError::StorePoisoned)
    }

    /// Create an incident and trigger the immediate response: notify the
    /// severity's contacts, select runbooks (auto-executing the fastest
    /// automatable one for P1), and schedule the escalation timer.
    ///
    /// Must be called from within a tokio runtime when the severity's
    /// policy has a non-zero escalation timeout.
    pub fn create(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: IncidentSeverity,
        incident_type: IncidentType,
        affected_services: Vec<String>,
        detected_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, IncidentError> {
        let mut incident = Incident::new(
            title,
            description,
            severity,
            incident_type,
            affected_services,
            detected_by,
            now,
        );
        info!(id = %incident.id, severity = severity.as_str(), "incident created");

        self.notify_contacts(
            &incident,
            &format!("[{}] {} detected: {}", severity.as_str(), incident.id, incident.title),
        );

        let applicable = self.runbooks.find_applicable(incident_type, severity);
        if severity == IncidentSeverity::P1
            && applicable.first().is_some_and(|r| r.automatable)
        {
            // find_applicable sorts fastest-first for P1, so this is the
            // quickest automatable mitigation
            let runbook = applicable[0];
            run_runbook(&mut incident, runbook, "auto-responder", now);
        } else if !applicable.is_empty() {
            let names: Vec<&str> = applicable.iter().map(|r| r.name.as_str()).collect();
            incident.log(
                TimelineKind::RunbooksSuggested,
                format!("Runbooks suggested: {}", names.join(", ")),
                None,
                now,
            );
        }

        let policy = self.policies.policy(severity);
        let mut store = self.lock()?;
        store.incidents.insert(incident.id.clone(), incident.clone());
        if policy.timeout_minutes > 0 {
            let handle = self.spawn_escalation_timer(incident.id.clone(), policy);
            store.timers.insert(incident.id.clone(), handle);
        }
        Ok(incident)
    }

    /// Acknowledge an incident. Legal only from `detected`; moves it to
    /// `investigating`, stamps the MTTA baseline, and cancels the
    /// escalation timer: an owned incident no longer auto-escalates.
    pub fn acknowledge(
        &self,
        id: &str,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, IncidentError> {
        let by = by.into();
        let mut store = self.lock()?;
        let incident = store
            .incidents
            .get_mut(id)
            .ok_or_else(|| IncidentError::NotFound(id.to_string()))?;

        if incident.status != IncidentStatus::Detected {
            return Err(IncidentError::NotAcknowledgeable {
                id: id.to_string(),
                status: incident.status,
            });
        }

        incident.status = IncidentStatus::Investigating;
        incident.acknowledged_at = Some(now);
        incident.assignee = Some(by.clone());
        incident.log(
            TimelineKind::Acknowledged,
            format!("Acknowledged by {by}"),
            Some(by),
            now,
        );
        let snapshot = incident.clone();
        cancel_timer(&mut store, id);
        Ok(snapshot)
    }

    /// Apply a status change and/or free-text update. A transition to
    /// `resolved` stamps `resolved_at` and cancels the escalation timer.
    pub fn update(
        &self,
        id: &str,
        status: Option<IncidentStatus>,
        message: Option<&str>,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, IncidentError> {
        let by = by.into();
        let mut store = self.lock()?;
        let incident = store
            .incidents
            .get_mut(id)
            .ok_or_else(|| IncidentError::NotFound(id.to_string()))?;

        if incident.status == IncidentStatus::Closed {
            return Err(IncidentError::Closed(id.to_string()));
        }

        // Validate before mutating anything
        if let Some(to) = status {
            if !incident.status.can_transition_to(to) {
                return Err(IncidentError::InvalidTransition {
                    from: incident.status,
                    to,
                });
            }
        }

        if let Some(to) = status {
            let from = incident.status;
            incident.status = to;
            incident.log(
                TimelineKind::StatusChange,
                format!("Status changed: {} -> {}", from.as_str(), to.as_str()),
                Some(by.clone()),
                now,
            );
            if to == IncidentStatus::Resolved {
                incident.resolved_at = Some(now);
            }
        }

        if let Some(text) = message {
            incident.log(TimelineKind::Update, text.to_string(), Some(by.clone()), now);
        }

        let snapshot = incident.clone();
        if snapshot.status == IncidentStatus::Resolved {
            cancel_timer(&mut store, id);
        }
        drop(store);

        if snapshot.severity.is_major() {
            self.notify_contacts(
                &snapshot,
                &format!("[{}] {} update: {}", snapshot.severity.as_str(), snapshot.id, snapshot.title),
            );
        }
        Ok(snapshot)
    }

    /// Resolve with a mandatory summary; cancels the escalation timer and
    /// sends a resolution notification.
    pub fn resolve(
        &self,
        id: &str,
        summary: impl Into<String>,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, IncidentError> {
        let summary = summary.into();
        let by = by.into();
        let mut store = self.lock()?;
        let incident = store
            .incidents
            .get_mut(id)
            .ok_or_else(|| IncidentError::NotFound(id.to_string()))?;

        if !incident.status.can_transition_to(IncidentStatus::Resolved) {
            return Err(IncidentError::InvalidTransition {
                from: incident.status,
                to: IncidentStatus::Resolved,
            });
        }

        let from = incident.status;
        incident.status = IncidentStatus::Resolved;
        incident.resolved_at = Some(now);
        incident.resolution_summary = Some(summary.clone());
        incident.log(
            TimelineKind::StatusChange,
            format!("Status changed: {} -> resolved", from.as_str()),
            Some(by.clone()),
            now,
        );
        incident.log(TimelineKind::Resolution, summary, Some(by), now);
        info!(id, "incident resolved");

        let snapshot = incident.clone();
        cancel_timer(&mut store, id);
        drop(store);

        self.notify_contacts(
            &snapshot,
            &format!("[{}] {} resolved: {}", snapshot.severity.as_str(), snapshot.id, snapshot.title),
        );
        Ok(snapshot)
    }

    /// Execute a runbook against an incident, recording one timeline entry
    /// per step. Does not alter the incident's status.
    pub fn execute_runbook(
        &self,
        id: &str,
        runbook_name: &str,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, IncidentError> {
        let by = by.into();
        let runbooks = self.runbooks.clone();
        let runbook = runbooks
            .get(runbook_name)
            .ok_or_else(|| IncidentError::UnknownRunbook(runbook_name.to_string()))?;

        let mut store = self.lock()?;
        let incident = store
            .incidents
            .get_mut(id)
            .ok_or_else(|| IncidentError::NotFound(id.to_string()))?;
        if incident.status == IncidentStatus::Closed {
            return Err(IncidentError::Closed(id.to_string()));
        }

        run_runbook(incident, runbook, &by, now);
        Ok(incident.clone())
    }

    /// Look up one incident
    pub fn get(&self, id: &str) -> Result<Incident, IncidentError> {
        let store = self.lock()?;
        store
            .incidents
            .get(id)
            .cloned()
            .ok_or_else(|| IncidentError::NotFound(id.to_string()))
    }

    /// All incidents that are not resolved or closed
    pub fn open_incidents(&self) -> Vec<Incident> {
        match self.lock() {
            Ok(store) => store.incidents.values().filter(|i| i.is_open()).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Aggregated figures over incidents created in the trailing `days`
    pub fn metrics(&self, days: u32, now: DateTime<Utc>) -> IncidentMetrics {
        let cutoff = now - Duration::days(days as i64);
        let store = match self.lock() {
            Ok(store) => store,
            Err(_) => return IncidentMetrics::default(),
        };

        let mut metrics = IncidentMetrics::default();
        let mut mtta_minutes = Vec::new();
        let mut mttr_minutes = Vec::new();

        for incident in store.incidents.values().filter(|i| i.created_at >= cutoff) {
            metrics.total += 1;
            if incident.is_open() {
                metrics.open += 1;
            } else {
                metrics.resolved += 1;
            }
            *metrics.by_severity.entry(incident.severity).or_insert(0) += 1;
            if let Some(mtta) = incident.mtta() {
                mtta_minutes.push(mtta.num_seconds() as f64 / 60.0);
            }
            if let Some(mttr) = incident.mttr() {
                mttr_minutes.push(mttr.num_seconds() as f64 / 60.0);
            }
        }

        metrics.avg_mtta_minutes = average(&mtta_minutes);
        metrics.avg_mttr_minutes = average(&mttr_minutes);
        metrics
    }

    /// Notify the severity's immediate-contact list. Delivery failures are
    /// logged per contact and never fail the incident operation.
    fn notify_contacts(&self, incident: &Incident, title: &str) {
        let body = format!(
            "{}\nServices: {}\nStatus: {}",
            incident.description,
            incident.affected_services.join(", "),
            incident.status.as_str(),
        );
        for contact in self.contacts.immediate(incident.severity) {
            if let Err(e) = self.router.notify(contact.channel, title, &body) {
                warn!(contact = %contact.name, error = %e, "contact notification failed");
            }
        }
    }

    /// Spawn the delayed escalation task for one incident. The task sleeps
    /// for the policy timeout, then escalates if the incident is still open,
    /// repeating while further levels remain in the chain.
    fn spawn_escalation_timer(&self, id: String, policy: EscalationPolicy) -> JoinHandle<()> {
        let store = self.store.clone();
        let router = self.router.clone();
        let contacts = self.contacts.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(StdDuration::from_secs(policy.timeout_minutes * 60)).await;

                let done = {
                    let Ok(mut store) = store.lock() else { return };
                    let Some(incident) = store.incidents.get_mut(&id) else {
                        store.timers.remove(&id);
                        return;
                    };
                    if !incident.is_open() || incident.acknowledged_at.is_some() {
                        store.timers.remove(&id);
                        return;
                    }

                    match policy.next_level(incident.escalation_level) {
                        Some(level) => {
                            incident.escalation_level = level;
                            let now = Utc::now();
                            incident.log(
                                TimelineKind::Escalated,
                                format!("Escalated to L{level} after {}m without resolution", policy.timeout_minutes),
                                None,
                                now,
                            );
                            warn!(id = %id, level, "incident escalated");

                            let title = format!(
                                "[{}] {} escalated to L{level}: {}",
                                incident.severity.as_str(),
                                incident.id,
                                incident.title,
                            );
                            let body = format!(
                                "{}\nUnresolved for {}m, now at escalation level L{level}.",
                                incident.description, policy.timeout_minutes,
                            );
                            let mut targets: Vec<&Contact> = contacts.at_level(level).iter().collect();
                            if policy.notify_management {
                                targets.extend(contacts.management());
                            }
                            for contact in targets {
                                if let Err(e) = router.notify(contact.channel, &title, &body) {
                                    warn!(contact = %contact.name, error = %e, "escalation notification failed");
                                }
                            }

                            let exhausted = policy.next_level(level).is_none();
                            if exhausted {
                                store.timers.remove(&id);
                            }
                            exhausted
                        }
                        None => {
                            store.timers.remove(&id);
                            true
                        }
                    }
                };

                if done {
                    return;
                }
            }
        })
    }
}

/// Abort and drop an incident's escalation timer, if one is scheduled.
/// Called while holding the store lock, atomically with the status change.
fn cancel_timer(store: &mut Store, id: &str) {
    if let Some(handle) = store.timers.remove(id) {
        handle.abort();
    }
}

/// Record a runbook execution on the incident timeline
fn run_runbook(incident: &mut Incident, runbook: &Runbook, by: &str, now: DateTime<Utc>) {
    incident.log(
        TimelineKind::RunbookStarted,
        format!("Runbook started: {}", runbook.name),
        Some(by.to_string()),
        now,
    );
    let total = runbook.steps.len();
    for (i, step) in runbook.steps.iter().enumerate() {
        incident.log(
            TimelineKind::RunbookStep,
            format!("Step {}/{}: {}", i + 1, total, step),
            Some(by.to_string()),
            now,
        );
    }
    incident.log(
        TimelineKind::RunbookCompleted,
        format!("Runbook completed: {}", runbook.name),
        Some(by.to_string()),
        now,
    );
    incident.runbook_executed = Some(runbook.name.clone());
    info!(id = %incident.id, runbook = %runbook.name, "runbook executed");
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::ChannelKind;
    use crate::policy::Contact;
    use routing::{BusinessHours, Notifier, NotifyError};
    use std::sync::Mutex as StdMutex;

    fn ts(offset_mins: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-04T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(offset_mins)
    }

    struct RecordingNotifier {
        kind: ChannelKind,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        fn send(&self, title: &str, _body: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(title.to_string());
            Ok(())
        }
    }

    struct Fixture {
        manager: IncidentManager,
        sms_sent: Arc<StdMutex<Vec<String>>>,
        email_sent: Arc<StdMutex<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let sms_sent = Arc::new(StdMutex::new(Vec::new()));
        let email_sent = Arc::new(StdMutex::new(Vec::new()));
        let router = Arc::new(
            Router::new(Vec::new(), BusinessHours::default())
                .with_notifier(Box::new(RecordingNotifier {
                    kind: ChannelKind::Sms,
                    sent: sms_sent.clone(),
                }))
                .with_notifier(Box::new(RecordingNotifier {
                    kind: ChannelKind::Email,
                    sent: email_sent.clone(),
                })),
        );
        let contacts = ContactDirectory::new()
            .with_immediate(
                IncidentSeverity::P1,
                vec![Contact {
                    name: "primary-oncall".to_string(),
                    channel: ChannelKind::Sms,
                    address: "+15550100".to_string(),
                }],
            )
            .with_level(
                2,
                vec![Contact {
                    name: "secondary-oncall".to_string(),
                    channel: ChannelKind::Email,
                    address: "secondary@example.com".to_string(),
                }],
            );
        let manager = IncidentManager::new(
            router,
            PolicyMatrix::default(),
            contacts,
            RunbookLibrary::default_catalogue(),
        );
        Fixture {
            manager,
            sms_sent,
            email_sent,
        }
    }

    fn create_p1(fx: &Fixture, now: DateTime<Utc>) -> Incident {
        fx.manager
            .create(
                "service_down",
                "api returning 5xx",
                IncidentSeverity::P1,
                IncidentType::Outage,
                vec!["api".to_string()],
                "monitor",
                now,
            )
            .unwrap()
    }

    /// Let spawned timer tasks make progress under the paused clock
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    /// Scenario: P1 creation notifies immediate contacts, auto-executes the
    /// fastest automatable runbook, and schedules escalation.
    #[tokio::test(start_paused = true)]
    async fn test_p1_immediate_response() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));

        assert_eq!(fx.sms_sent.lock().unwrap().len(), 1);
        assert_eq!(incident.runbook_executed.as_deref(), Some("restart_service"));
        assert!(incident
            .timeline
            .iter()
            .any(|e| e.kind == TimelineKind::RunbookCompleted));
        // restart_service has 5 steps
        let steps = incident
            .timeline
            .iter()
            .filter(|e| e.kind == TimelineKind::RunbookStep)
            .count();
        assert_eq!(steps, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_fires_once_after_timeout() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));
        settle().await;

        tokio::time::advance(StdDuration::from_secs(16 * 60)).await;
        settle().await;

        let current = fx.manager.get(&incident.id).unwrap();
        assert_eq!(current.escalation_level, 2);
        let escalations = current
            .timeline
            .iter()
            .filter(|e| e.kind == TimelineKind::Escalated)
            .count();
        assert_eq!(escalations, 1);
        // L2 contact was notified over email
        assert_eq!(fx.email_sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_cancels_escalation() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));
        settle().await;

        tokio::time::advance(StdDuration::from_secs(10 * 60)).await;
        settle().await;
        fx.manager
            .resolve(&incident.id, "rolled back bad deploy", "sam", ts(10))
            .unwrap();

        tokio::time::advance(StdDuration::from_secs(30 * 60)).await;
        settle().await;

        let current = fx.manager.get(&incident.id).unwrap();
        assert_eq!(current.escalation_level, 1);
        assert!(!current.timeline.iter().any(|e| e.kind == TimelineKind::Escalated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_cancels_escalation() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));
        settle().await;

        tokio::time::advance(StdDuration::from_secs(5 * 60)).await;
        settle().await;
        fx.manager.acknowledge(&incident.id, "sam", ts(5)).unwrap();

        // Past the 15-minute P1 timeout; ownership stops the chain
        tokio::time::advance(StdDuration::from_secs(11 * 60)).await;
        settle().await;

        let current = fx.manager.get(&incident.id).unwrap();
        assert_eq!(current.escalation_level, 1);
        assert!(!current.timeline.iter().any(|e| e.kind == TimelineKind::Escalated));
        assert_eq!(current.mtta(), Some(Duration::minutes(5)));
        assert!(fx.email_sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_chain_advances_through_levels() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));
        settle().await;

        tokio::time::advance(StdDuration::from_secs(15 * 60)).await;
        settle().await;
        assert_eq!(fx.manager.get(&incident.id).unwrap().escalation_level, 2);

        tokio::time::advance(StdDuration::from_secs(15 * 60)).await;
        settle().await;
        assert_eq!(fx.manager.get(&incident.id).unwrap().escalation_level, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_sets_mtta() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));

        let acked = fx.manager.acknowledge(&incident.id, "sam", ts(5)).unwrap();
        assert_eq!(acked.status, IncidentStatus::Investigating);
        assert_eq!(acked.mtta(), Some(Duration::minutes(5)));
        assert_eq!(acked.assignee.as_deref(), Some("sam"));

        // Only legal from detected
        let err = fx.manager.acknowledge(&incident.id, "alex", ts(6)).unwrap_err();
        assert!(matches!(err, IncidentError::NotAcknowledgeable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_and_resolve_flow() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));

        fx.manager.acknowledge(&incident.id, "sam", ts(5)).unwrap();
        fx.manager
            .update(
                &incident.id,
                Some(IncidentStatus::Identified),
                Some("bad deploy identified"),
                "sam",
                ts(12),
            )
            .unwrap();
        let resolved = fx.manager
            .resolve(&incident.id, "rolled back", "sam", ts(40))
            .unwrap();

        assert_eq!(resolved.status, IncidentStatus::Resolved);
        assert_eq!(resolved.mttr(), Some(Duration::minutes(40)));
        assert_eq!(resolved.resolution_summary.as_deref(), Some("rolled back"));

        // Resolved incidents can only close
        let err = fx.manager
            .update(&incident.id, Some(IncidentStatus::Investigating), None, "sam", ts(41))
            .unwrap_err();
        assert!(matches!(err, IncidentError::InvalidTransition { .. }));

        fx.manager
            .update(&incident.id, Some(IncidentStatus::Closed), None, "sam", ts(50))
            .unwrap();
        let err = fx.manager
            .update(&incident.id, None, Some("too late"), "sam", ts(51))
            .unwrap_err();
        assert!(matches!(err, IncidentError::Closed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_runbook_preserves_status_and_order() {
        let fx = fixture();
        let incident = create_p1(&fx, ts(0));
        let before = fx.manager.get(&incident.id).unwrap().status;

        let updated = fx.manager
            .execute_runbook(&incident.id, "failover_database", "sam", ts(5))
            .unwrap();

        assert_eq!(updated.status, before);
        assert_eq!(updated.runbook_executed.as_deref(), Some("failover_database"));
        let steps: Vec<&str> = updated
            .timeline
            .iter()
            .filter(|e| e.kind == TimelineKind::RunbookStep && e.at == ts(5))
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(steps.len(), 4);
        assert!(steps[0].starts_with("Step 1/4"));
        assert!(steps[3].starts_with("Step 4/4"));

        let err = fx.manager
            .execute_runbook(&incident.id, "nope", "sam", ts(6))
            .unwrap_err();
        assert!(matches!(err, IncidentError::UnknownRunbook(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_aggregation() {
        let fx = fixture();
        let a = create_p1(&fx, ts(0));
        fx.manager
            .create(
                "slow checkout",
                "p95 latency doubled",
                IncidentSeverity::P3,
                IncidentType::Performance,
                vec!["checkout".to_string()],
                "monitor",
                ts(1),
            )
            .unwrap();

        fx.manager.acknowledge(&a.id, "sam", ts(10)).unwrap();
        fx.manager.resolve(&a.id, "fixed", "sam", ts(30)).unwrap();

        let metrics = fx.manager.metrics(7, ts(60));
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.open, 1);
        assert_eq!(metrics.resolved, 1);
        assert_eq!(metrics.by_severity[&IncidentSeverity::P1], 1);
        assert_eq!(metrics.avg_mtta_minutes, Some(10.0));
        assert_eq!(metrics.avg_mttr_minutes, Some(30.0));
    }
}
