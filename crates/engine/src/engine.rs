//! Engine Owner Struct
//!
//! One `Engine` owns the metric history, alert registry, correlation
//! engine, router, SLO manager, and incident manager. No global state:
//! tests run multiple independent engines in one process.
//!
//! The registry and SLO budgets are guarded by mutexes because both
//! periodic drivers and incident creation can touch them concurrently.
//! Notification dispatch is spawned onto the runtime so a slow channel
//! never blocks an evaluation cycle; delivery outcomes are recorded back
//! into the registry under its lock.

use crate::config::{ConfigError, EngineConfig, EngineSettings};
use alerting::{
    Alert, AlertError, AlertEvent, AlertRegistry, AlertRule, AlertSummary, ChannelKind, Severity,
};
use chrono::{DateTime, Duration, Utc};
use correlation::{dedupe, AlertGroup, CorrelationEngine, UNCORRELATED_GROUP};
use incident::{
    ContactDirectory, Incident, IncidentError, IncidentManager, IncidentMetrics, IncidentSeverity,
    IncidentStatus, IncidentType, PolicyMatrix, RunbookLibrary,
};
use metric_history::MetricHistory;
use routing::{format_duration, Notifier, Router};
use slo::{Slo, SloError, SloManager, SloSignal, SloStatus, SliObservation};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Budget-consumed thresholds for the virtual SLO alert rules, mirroring
/// the manager's remaining-budget lines
const BUDGET_CRITICAL_CONSUMED_PCT: f64 = 90.0;
const BUDGET_WARNING_CONSUMED_PCT: f64 = 75.0;

/// Runtime errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Slo(#[from] SloError),

    #[error(transparent)]
    Incident(#[from] IncidentError),

    /// A thread panicked while holding an engine lock
    #[error("Engine state lock poisoned")]
    Poisoned,
}

/// What one alert-evaluation cycle did
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Fired, refired, and resolved events this cycle
    pub events: Vec<AlertEvent>,
    /// Correlation groups over the currently active alerts
    pub groups: Vec<AlertGroup>,
    /// Ids of incidents opened from critical groups this cycle
    pub incidents_created: Vec<String>,
}

/// The explicit owner of all alerting pipeline state
pub struct Engine {
    history: Mutex<MetricHistory>,
    registry: Arc<Mutex<AlertRegistry>>,
    rules: Vec<AlertRule>,
    correlator: CorrelationEngine,
    router: Arc<Router>,
    slos: Mutex<SloManager>,
    incidents: IncidentManager,
    settings: EngineSettings,
    /// Correlation group name -> incident id, so one group opens one incident
    group_incidents: Mutex<HashMap<String, String>>,
    /// Rule name -> last evaluation time, for per-rule interval gating
    rule_last_eval: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Engine {
    /// Wire an engine from validated configuration. Notifiers are resolved
    /// once here; an unroutable channel is a configuration error.
    pub fn new(
        config: EngineConfig,
        notifiers: Vec<Box<dyn Notifier>>,
        contacts: ContactDirectory,
        now: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut router = Router::new(config.routes, config.business_hours);
        for notifier in notifiers {
            router = router.with_notifier(notifier);
        }
        if let Err(kind) = router.channels_covered() {
            return Err(ConfigError::Invalid(format!(
                "no template for routed channel {}",
                kind.as_str()
            )));
        }
        let router = Arc::new(router);

        let incidents = IncidentManager::new(
            router.clone(),
            PolicyMatrix::default(),
            contacts,
            RunbookLibrary::default_catalogue(),
        );

        let mut slos = SloManager::new();
        for slo in config.slos {
            slos.add_slo(slo, now);
        }

        info!(rules = config.rules.len(), "engine wired");
        Ok(Self {
            history: Mutex::new(MetricHistory::with_default_capacity()),
            registry: Arc::new(Mutex::new(AlertRegistry::new())),
            rules: config.rules,
            correlator: CorrelationEngine::new(config.correlations),
            router,
            slos: Mutex::new(slos),
            incidents,
            settings: config.engine,
            group_incidents: Mutex::new(HashMap::new()),
            rule_last_eval: Mutex::new(HashMap::new()),
        })
    }

    /// Engine timing settings
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Append one metric sample to the rolling history
    pub fn record_metric(
        &self,
        series: &str,
        value: f64,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut history = self.history.lock().map_err(|_| EngineError::Poisoned)?;
        history.record(series, value, now);
        Ok(())
    }

    /// Run one alert-evaluation cycle: evaluate the enabled rules that are
    /// due against their series' latest sample, dispatch the resulting
    /// events, correlate the active alerts, and open incidents for critical
    /// groups. A rule is due when its `eval_interval_secs` have elapsed
    /// since its last evaluation; a rule seen for the first time is always
    /// due.
    ///
    /// A rule whose series has no samples yet is logged and skipped; it
    /// never aborts the rest of the cycle.
    ///
    /// Correlation runs over the full active set, not just this cycle's
    /// events, so groups can form across cycles as related alerts trickle
    /// in. The group-to-incident map keeps a group that persists across
    /// cycles from opening more than one incident.
    pub fn run_evaluation_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, EngineError> {
        let mut report = CycleReport::default();

        {
            let history = self.history.lock().map_err(|_| EngineError::Poisoned)?;
            let mut registry = self.registry.lock().map_err(|_| EngineError::Poisoned)?;
            let mut last_eval = self.rule_last_eval.lock().map_err(|_| EngineError::Poisoned)?;
            for rule in self.rules.iter().filter(|r| r.enabled) {
                if let Some(&last) = last_eval.get(&rule.name) {
                    if now - last < Duration::seconds(rule.eval_interval_secs as i64) {
                        continue;
                    }
                }
                let Some(sample) = history.latest(&rule.series) else {
                    debug!(rule = %rule.name, series = %rule.series, "no samples yet, skipping");
                    continue;
                };
                last_eval.insert(rule.name.clone(), now);
                if let Some(event) = registry.evaluate(rule, sample.value, &history, now) {
                    report.events.push(event);
                }
            }
        }

        self.dispatch_events(&report.events, now);

        let active = {
            let registry = self.registry.lock().map_err(|_| EngineError::Poisoned)?;
            registry.active_alerts()
        };
        report.groups = self.correlator.correlate(&dedupe(&active), now);

        if self.settings.incident_on_critical_group {
            report.incidents_created = self.open_group_incidents(&report.groups, now)?;
        }

        Ok(report)
    }

    /// Run one SLO-evaluation cycle over the supplied observations.
    ///
    /// Budget signals are fed back through the same registry/router path as
    /// metric alerts via virtual static rules, so SLO alerts throttle,
    /// resolve, and route like any other alert.
    pub fn run_slo_cycle(
        &self,
        observations: &[(String, SliObservation)],
        now: DateTime<Utc>,
    ) -> Result<Vec<SloSignal>, EngineError> {
        let cycle_secs = self.settings.slo_interval_secs;
        let mut signals = Vec::new();
        let mut evaluated: Vec<(Slo, SloStatus)> = Vec::new();

        {
            let mut slos = self.slos.lock().map_err(|_| EngineError::Poisoned)?;
            for (name, observation) in observations {
                match slos.evaluate(name, *observation, cycle_secs, now) {
                    Ok(cycle_signals) => {
                        signals.extend(cycle_signals);
                        if let (Some(slo), Some(status)) = (slos.slo(name), slos.status(name)) {
                            evaluated.push((slo.clone(), status));
                        }
                    }
                    // A failing SLO logs and the cycle continues
                    Err(e) => warn!(slo = %name, error = %e, "SLO evaluation failed"),
                }
            }
        }

        let mut events = Vec::new();
        {
            let history = self.history.lock().map_err(|_| EngineError::Poisoned)?;
            let mut registry = self.registry.lock().map_err(|_| EngineError::Poisoned)?;
            for (slo, status) in &evaluated {
                for (rule, value) in virtual_slo_rules(slo, status) {
                    if let Some(event) = registry.evaluate(&rule, value, &history, now) {
                        events.push(event);
                    }
                }
            }
        }
        self.dispatch_events(&events, now);

        Ok(signals)
    }

    fn dispatch_events(&self, events: &[AlertEvent], now: DateTime<Utc>) {
        for event in events {
            match event {
                AlertEvent::Fired(alert) | AlertEvent::Refired(alert) => {
                    self.spawn_dispatch(alert.clone(), now);
                }
                AlertEvent::Resolved { alert, notify } => {
                    if *notify {
                        self.spawn_resolution_notice(alert.clone(), now);
                    }
                }
            }
        }
    }

    /// Fan out one alert's notifications off the cycle's critical path.
    /// When no routing rule matches, the alert rule's own channel list is
    /// used before the router default. Escalation channels whose minute
    /// threshold has elapsed are added on top of the routed set.
    fn spawn_dispatch(&self, alert: Alert, now: DateTime<Utc>) {
        let router = self.router.clone();
        let registry = self.registry.clone();
        // Virtual rules (SLO signals) have no entry here and get an empty
        // fallback, leaving them on the router default
        let fallback: Vec<ChannelKind> = self
            .rules
            .iter()
            .find(|r| r.name == alert.rule_name)
            .map(|r| r.channels.clone())
            .unwrap_or_default();
        tokio::spawn(async move {
            let mut outcome = router.dispatch_with_fallback(&alert, &fallback, now);

            let minutes = (now - alert.started_at).num_minutes().max(0) as u32;
            if minutes > 0 {
                let mut attempted: BTreeSet<ChannelKind> = outcome.channels_sent.clone();
                attempted.extend(outcome.failed.iter().copied());
                let escalated: BTreeSet<ChannelKind> = router
                    .escalation_channels(&alert, minutes, now)
                    .difference(&attempted)
                    .copied()
                    .collect();
                if !escalated.is_empty() {
                    info!(alert = %alert.rule_name, minutes, "escalation channels added");
                    let extra = router.dispatch_channels(&alert, &escalated, now);
                    outcome.channels_sent.extend(extra.channels_sent);
                    outcome.failed.extend(extra.failed);
                }
            }

            if let Ok(mut registry) = registry.lock() {
                registry.record_sent(alert.fingerprint, &outcome.channels_sent, now);
            }
        });
    }

    /// Tell every channel that saw the alert fire that it has cleared
    fn spawn_resolution_notice(&self, alert: Alert, now: DateTime<Utc>) {
        let router = self.router.clone();
        tokio::spawn(async move {
            let elapsed = alert.resolved_at.unwrap_or(now) - alert.started_at;
            let title = format!("[resolved] [{}] {}", alert.severity.as_str(), alert.rule_name);
            let body = format!(
                "Alert {} resolved after {}. Last value: {:.2}",
                alert.rule_name,
                format_duration(elapsed),
                alert.metric_value,
            );
            for &kind in &alert.channels_sent {
                if let Err(e) = router.notify(kind, &title, &body) {
                    warn!(channel = kind.as_str(), error = %e, "resolution notice failed");
                }
            }
        });
    }

    /// Open a P1 incident per critical correlated group. One incident per
    /// group name while that incident stays open.
    fn open_group_incidents(
        &self,
        groups: &[AlertGroup],
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, EngineError> {
        let mut tracked = self.group_incidents.lock().map_err(|_| EngineError::Poisoned)?;
        tracked.retain(|_, id| {
            self.incidents
                .get(id)
                .map(|incident| incident.is_open())
                .unwrap_or(false)
        });

        let mut created = Vec::new();
        for group in groups {
            if group.rule_name == UNCORRELATED_GROUP
                || group.max_severity() != Some(Severity::Critical)
                || tracked.contains_key(&group.rule_name)
            {
                continue;
            }

            let rule_names: Vec<&str> = group.alerts.iter().map(|a| a.rule_name.as_str()).collect();
            let incident = self.incidents.create(
                format!("Correlated alert group: {}", group.rule_name),
                format!("Critical alert group with {} alerts: {}", group.alerts.len(), rule_names.join(", ")),
                IncidentSeverity::P1,
                IncidentType::Outage,
                group.affected_services(),
                "correlation-engine",
                now,
            )?;
            info!(group = %group.rule_name, incident = %incident.id, "incident opened from alert group");
            tracked.insert(group.rule_name.clone(), incident.id.clone());
            created.push(incident.id);
        }
        Ok(created)
    }

    // Query surface

    /// Snapshot of all active alerts
    pub fn active_alerts(&self) -> Result<Vec<Alert>, EngineError> {
        let registry = self.registry.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(registry.active_alerts())
    }

    /// Alert counts by state and severity
    pub fn alert_summary(&self) -> Result<AlertSummary, EngineError> {
        let registry = self.registry.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(registry.summary())
    }

    /// Acknowledge a firing alert by fingerprint
    pub fn acknowledge_alert(
        &self,
        fingerprint: u64,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut registry = self.registry.lock().map_err(|_| EngineError::Poisoned)?;
        registry.acknowledge(fingerprint, by, now)?;
        Ok(())
    }

    /// Mute an active alert by fingerprint
    pub fn suppress_alert(&self, fingerprint: u64) -> Result<(), EngineError> {
        let mut registry = self.registry.lock().map_err(|_| EngineError::Poisoned)?;
        registry.suppress(fingerprint)?;
        Ok(())
    }

    /// Status for one SLO
    pub fn slo_status(&self, name: &str) -> Result<Option<SloStatus>, EngineError> {
        let slos = self.slos.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(slos.status(name))
    }

    /// Names of all registered SLOs
    pub fn slo_names(&self) -> Result<Vec<String>, EngineError> {
        let slos = self.slos.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(slos.slo_names())
    }

    /// Open an incident from an external signal
    #[allow(clippy::too_many_arguments)]
    pub fn create_incident(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: IncidentSeverity,
        incident_type: IncidentType,
        affected_services: Vec<String>,
        detected_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, EngineError> {
        Ok(self.incidents.create(
            title,
            description,
            severity,
            incident_type,
            affected_services,
            detected_by,
            now,
        )?)
    }

    /// Acknowledge an incident
    pub fn acknowledge_incident(
        &self,
        id: &str,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, EngineError> {
        Ok(self.incidents.acknowledge(id, by, now)?)
    }

    /// Apply an incident status change and/or update message
    pub fn update_incident(
        &self,
        id: &str,
        status: Option<IncidentStatus>,
        message: Option<&str>,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, EngineError> {
        Ok(self.incidents.update(id, status, message, by, now)?)
    }

    /// Resolve an incident with a summary
    pub fn resolve_incident(
        &self,
        id: &str,
        summary: impl Into<String>,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, EngineError> {
        Ok(self.incidents.resolve(id, summary, by, now)?)
    }

    /// Execute a runbook against an incident
    pub fn execute_runbook(
        &self,
        id: &str,
        runbook: &str,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Incident, EngineError> {
        Ok(self.incidents.execute_runbook(id, runbook, by, now)?)
    }

    /// Look up one incident
    pub fn get_incident(&self, id: &str) -> Result<Incident, EngineError> {
        Ok(self.incidents.get(id)?)
    }

    /// All open incidents
    pub fn open_incidents(&self) -> Vec<Incident> {
        self.incidents.open_incidents()
    }

    /// Aggregated incident figures over the trailing `days`
    pub fn incident_metrics(&self, days: u32, now: DateTime<Utc>) -> IncidentMetrics {
        self.incidents.metrics(days, now)
    }
}

/// Static virtual rules feeding SLO signals through the alert path. Values
/// are chosen so that the condition clears naturally when the budget
/// recovers at window rollover.
fn virtual_slo_rules(slo: &Slo, status: &SloStatus) -> Vec<(AlertRule, f64)> {
    let consumed = 100.0 - status.budget.remaining_of_total();
    let labeled = |rule: AlertRule| {
        rule.with_label("slo", &slo.name)
            .with_label("service", &slo.service)
    };

    vec![
        (
            labeled(AlertRule::new(
                format!("slo_burn_rate_{}", slo.name),
                format!("slo:{}", slo.name),
                Severity::High,
                slo.burn_rate_alert_threshold,
            )),
            status.budget.burn_rate,
        ),
        (
            labeled(AlertRule::new(
                format!("slo_budget_critical_{}", slo.name),
                format!("slo:{}", slo.name),
                Severity::Critical,
                BUDGET_CRITICAL_CONSUMED_PCT,
            )),
            consumed,
        ),
        (
            labeled(AlertRule::new(
                format!("slo_budget_warning_{}", slo.name),
                format!("slo:{}", slo.name),
                Severity::Medium,
                BUDGET_WARNING_CONSUMED_PCT,
            )),
            consumed,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use routing::{NotifyError, RoutingRule};
    use slo::{SliKind, TimeWindow};
    use std::sync::Mutex as StdMutex;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-04T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_secs)
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

    fn test_config() -> EngineConfig {
        EngineConfig {
            rules: vec![
                AlertRule::new("high_error_rate", "error_rate", Severity::High, 5.0)
                    .with_label("service", "api"),
            ],
            routes: vec![RoutingRule {
                name: "everything_email".to_string(),
                severities: None,
                business_hours_only: false,
                after_hours_only: false,
                label_equals: Default::default(),
                rule_name_pattern: None,
                channels: vec![ChannelKind::Email],
                escalation: Default::default(),
            }],
            ..Default::default()
        }
    }

    fn engine_with_recorder(config: EngineConfig) -> (Engine, Arc<StdMutex<Vec<String>>>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(RecordingNotifier {
            kind: ChannelKind::Email,
            sent: sent.clone(),
        })];
        let engine = Engine::new(config, notifiers, ContactDirectory::new(), ts(0)).unwrap();
        (engine, sent)
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    /// Scenario: values [2,3,6,7,1] on successive cycles fire at the 3rd
    /// sample, persist through the 4th under throttle, resolve at the 5th.
    #[tokio::test(start_paused = true)]
    async fn test_fire_persist_resolve_through_engine() {
        let (engine, sent) = engine_with_recorder(test_config());

        let values = [2.0, 3.0, 6.0, 7.0, 1.0];
        let mut fired = 0;
        let mut resolved = 0;
        for (i, &value) in values.iter().enumerate() {
            let now = ts(i as i64 * 60);
            engine.record_metric("error_rate", value, now).unwrap();
            let report = engine.run_evaluation_cycle(now).unwrap();
            settle().await;
            for event in &report.events {
                match event {
                    AlertEvent::Fired(_) => fired += 1,
                    AlertEvent::Resolved { .. } => resolved += 1,
                    AlertEvent::Refired(_) => {}
                }
            }
        }

        assert_eq!(fired, 1);
        assert_eq!(resolved, 1);
        assert!(engine.active_alerts().unwrap().is_empty());
        // One firing notification, one resolution notice (high severity)
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_outcome_recorded_into_registry() {
        let (engine, _sent) = engine_with_recorder(test_config());

        engine.record_metric("error_rate", 10.0, ts(0)).unwrap();
        engine.run_evaluation_cycle(ts(0)).unwrap();
        settle().await;

        let alerts = engine.active_alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].send_count, 1);
        assert!(alerts[0].channels_sent.contains(&ChannelKind::Email));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_series_skips_rule() {
        let mut config = test_config();
        config
            .rules
            .push(AlertRule::new("no_data", "unknown_series", Severity::Low, 1.0));
        let (engine, _sent) = engine_with_recorder(config);

        engine.record_metric("error_rate", 10.0, ts(0)).unwrap();
        // The rule with no samples is skipped; the other still fires
        let report = engine.run_evaluation_cycle(ts(0)).unwrap();
        assert_eq!(report.events.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rule_eval_interval_gates_cycles() {
        let mut config = test_config();
        config.rules[0].eval_interval_secs = 120;
        let (engine, _sent) = engine_with_recorder(config);

        engine.record_metric("error_rate", 10.0, ts(0)).unwrap();
        let report = engine.run_evaluation_cycle(ts(0)).unwrap();
        assert_eq!(report.events.len(), 1);
        settle().await;

        // 60s later the rule is not yet due: the cleared value is not seen
        engine.record_metric("error_rate", 1.0, ts(60)).unwrap();
        let report = engine.run_evaluation_cycle(ts(60)).unwrap();
        assert!(report.events.is_empty());
        assert_eq!(engine.active_alerts().unwrap().len(), 1);

        // At 120s the interval has elapsed and the alert resolves
        let report = engine.run_evaluation_cycle(ts(120)).unwrap();
        settle().await;
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, AlertEvent::Resolved { .. })));
        assert!(engine.active_alerts().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rule_channels_used_when_unrouted() {
        let mut config = test_config();
        config.routes.clear();
        config.rules[0].channels = vec![ChannelKind::Chat];

        let email_sent = Arc::new(StdMutex::new(Vec::new()));
        let chat_sent = Arc::new(StdMutex::new(Vec::new()));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(RecordingNotifier {
                kind: ChannelKind::Email,
                sent: email_sent.clone(),
            }),
            Box::new(RecordingNotifier {
                kind: ChannelKind::Chat,
                sent: chat_sent.clone(),
            }),
        ];
        let engine = Engine::new(config, notifiers, ContactDirectory::new(), ts(0)).unwrap();

        engine.record_metric("error_rate", 10.0, ts(0)).unwrap();
        engine.run_evaluation_cycle(ts(0)).unwrap();
        settle().await;

        // The rule's own channels beat the router default when unrouted
        assert_eq!(chat_sent.lock().unwrap().len(), 1);
        assert!(email_sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slo_signals_flow_through_alert_path() {
        let mut config = test_config();
        config.slos.push(Slo {
            name: "api_availability".to_string(),
            service: "api".to_string(),
            sli: SliKind::Ratio,
            target_pct: 99.9,
            window: TimeWindow::Hour,
            burn_rate_alert_threshold: 1.0,
        });
        let (engine, _sent) = engine_with_recorder(config);

        // 95% availability: shortfall 4.9, burn rate well above 1.0
        let observations = vec![(
            "api_availability".to_string(),
            SliObservation::Ratio { good: 95, total: 100 },
        )];
        let signals = engine.run_slo_cycle(&observations, ts(0)).unwrap();
        settle().await;

        assert!(signals
            .iter()
            .any(|s| matches!(s, SloSignal::BurnRate { .. })));
        let active = engine.active_alerts().unwrap();
        assert!(active
            .iter()
            .any(|a| a.rule_name == "slo_burn_rate_api_availability"));

        // A healthy cycle resolves the virtual alert
        let healthy = vec![(
            "api_availability".to_string(),
            SliObservation::Ratio { good: 100_000, total: 100_000 },
        )];
        engine.run_slo_cycle(&healthy, ts(300)).unwrap();
        settle().await;
        let active = engine.active_alerts().unwrap();
        assert!(!active
            .iter()
            .any(|a| a.rule_name == "slo_burn_rate_api_availability"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_slo_does_not_abort_cycle() {
        let mut config = test_config();
        config.slos.push(Slo {
            name: "known".to_string(),
            service: "api".to_string(),
            sli: SliKind::Ratio,
            target_pct: 99.0,
            window: TimeWindow::Day,
            burn_rate_alert_threshold: 2.0,
        });
        let (engine, _sent) = engine_with_recorder(config);

        let observations = vec![
            ("missing".to_string(), SliObservation::Ratio { good: 1, total: 1 }),
            ("known".to_string(), SliObservation::Ratio { good: 99, total: 100 }),
        ];
        // The unknown SLO logs and is skipped; the known one still evaluates
        engine.run_slo_cycle(&observations, ts(0)).unwrap();
        let status = engine.slo_status("known").unwrap().unwrap();
        assert_eq!(status.current_sli_pct, 99.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_group_opens_one_incident() {
        let mut config = test_config();
        config.rules = vec![
            AlertRule::new("api_down", "api_up", Severity::Critical, 0.5)
                .with_label("service", "api"),
            AlertRule::new("db_down", "db_up", Severity::Critical, 0.5)
                .with_label("service", "db"),
        ];
        config.correlations = vec![correlation::CorrelationRule {
            name: "platform_outage".to_string(),
            time_window_minutes: 10,
            min_alerts: 2,
            severities: Some(vec![Severity::Critical]),
            label_patterns: Default::default(),
            rule_name_pattern: None,
        }];
        let (engine, _sent) = engine_with_recorder(config);

        engine.record_metric("api_up", 1.0, ts(0)).unwrap();
        engine.record_metric("db_up", 1.0, ts(0)).unwrap();
        let report = engine.run_evaluation_cycle(ts(0)).unwrap();
        settle().await;

        assert_eq!(report.incidents_created.len(), 1);
        let incident = engine.get_incident(&report.incidents_created[0]).unwrap();
        assert_eq!(incident.severity, IncidentSeverity::P1);
        assert_eq!(incident.affected_services, vec!["api", "db"]);

        // The next cycle sees the same open group and does not duplicate
        let report = engine.run_evaluation_cycle(ts(60)).unwrap();
        assert!(report.incidents_created.is_empty());
        assert_eq!(engine.open_incidents().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_rejected_at_wiring() {
        let mut config = test_config();
        config.routes[0].channels.clear();
        let result = Engine::new(config, Vec::new(), ContactDirectory::new(), ts(0));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_unknown_alert_is_typed_error() {
        let (engine, _sent) = engine_with_recorder(test_config());
        let err = engine.acknowledge_alert(42, "sam", ts(0)).unwrap_err();
        assert!(matches!(err, EngineError::Alert(AlertError::NotFound(_))));
    }
}
