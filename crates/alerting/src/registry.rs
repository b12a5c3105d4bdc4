//! Alert Registry
//!
//! Owns the authoritative set of active alerts keyed by fingerprint and
//! applies throttling and hourly rate limits. The registry never performs
//! delivery itself: `evaluate` reports what happened as an [`AlertEvent`]
//! and the caller records delivery outcomes back via `record_sent`.

use crate::alert::{Alert, AlertState};
use crate::error::AlertError;
use crate::evaluator::{dynamic_threshold, is_exceeded};
use crate::rule::{AlertRule, ChannelKind, Severity};
use chrono::{DateTime, Duration, Utc};
use metric_history::MetricHistory;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, info, warn};

/// Maximum resolved alerts kept for the query surface
const MAX_HISTORY: usize = 1000;

/// Outcome of one rule evaluation
#[derive(Debug, Clone)]
pub enum AlertEvent {
    /// A new alert was created; the first occurrence is always dispatched
    Fired(Alert),
    /// An existing alert is still firing and the throttle allows re-delivery
    Refired(Alert),
    /// The condition cleared; `notify` is set for critical/high severities
    Resolved { alert: Alert, notify: bool },
}

/// Counts for the dashboard surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertSummary {
    pub active: usize,
    pub firing: usize,
    pub acknowledged: usize,
    pub suppressed: usize,
    pub resolved_total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
}

/// Fingerprint-keyed alert store with throttling state
pub struct AlertRegistry {
    /// Active alerts by fingerprint. Invariant: at most one entry per
    /// fingerprint, so at most one firing alert per (rule, labels).
    active: HashMap<u64, Alert>,
    /// Resolved alerts, most recent last, bounded
    history: VecDeque<Alert>,
    /// Send timestamps per rule name for the trailing-hour rate limit
    sends: HashMap<String, VecDeque<DateTime<Utc>>>,
    /// First time the condition held, for rules with a minimum duration
    pending: HashMap<u64, DateTime<Utc>>,
}

impl AlertRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
            history: VecDeque::new(),
            sends: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Evaluate one rule against the current value.
    ///
    /// Returns `None` when nothing changed or the throttle suppressed
    /// re-delivery; the alert record is still updated in place while firing.
    pub fn evaluate(
        &mut self,
        rule: &AlertRule,
        value: f64,
        history: &MetricHistory,
        now: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        let fingerprint = rule.fingerprint();
        let exceeded = is_exceeded(rule, value, history, now);
        let threshold = dynamic_threshold(rule, history, now).unwrap_or(rule.threshold);

        if exceeded {
            if let Some(alert) = self.active.get_mut(&fingerprint) {
                alert.metric_value = value;
                alert.threshold = threshold;
                if self.should_send(fingerprint, rule, now) {
                    return Some(AlertEvent::Refired(self.active[&fingerprint].clone()));
                }
                debug!(rule = %rule.name, "refire suppressed by throttle");
                return None;
            }

            if rule.min_duration_secs > 0 {
                let since = *self.pending.entry(fingerprint).or_insert(now);
                if now - since < Duration::seconds(rule.min_duration_secs as i64) {
                    debug!(rule = %rule.name, "condition holding, below minimum duration");
                    return None;
                }
            }
            self.pending.remove(&fingerprint);

            let alert = Alert {
                fingerprint,
                rule_name: rule.name.clone(),
                severity: rule.severity,
                state: AlertState::Firing,
                metric_value: value,
                threshold,
                labels: rule.labels.clone(),
                started_at: now,
                last_sent_at: None,
                resolved_at: None,
                acknowledged_by: None,
                acknowledged_at: None,
                send_count: 0,
                channels_sent: BTreeSet::new(),
            };
            info!(rule = %rule.name, value, threshold, "alert firing");
            self.active.insert(fingerprint, alert.clone());
            return Some(AlertEvent::Fired(alert));
        }

        self.pending.remove(&fingerprint);

        if let Some(mut alert) = self.active.remove(&fingerprint) {
            alert.state = AlertState::Resolved;
            alert.resolved_at = Some(now);
            alert.metric_value = value;
            info!(rule = %rule.name, value, "alert resolved");

            if self.history.len() >= MAX_HISTORY {
                self.history.pop_front();
            }
            self.history.push_back(alert.clone());

            let notify = matches!(alert.severity, Severity::Critical | Severity::High);
            return Some(AlertEvent::Resolved { alert, notify });
        }

        None
    }

    /// Throttle and rate-limit gate for repeat notifications.
    fn should_send(&self, fingerprint: u64, rule: &AlertRule, now: DateTime<Utc>) -> bool {
        let alert = match self.active.get(&fingerprint) {
            Some(a) => a,
            None => return false,
        };

        if alert.state == AlertState::Suppressed {
            return false;
        }

        if let Some(last) = alert.last_sent_at {
            if now - last < Duration::seconds(rule.throttle_secs as i64) {
                return false;
            }
        }

        let hour_ago = now - Duration::hours(1);
        let recent = self
            .sends
            .get(&rule.name)
            .map(|times| times.iter().filter(|&&t| t > hour_ago).count())
            .unwrap_or(0);
        if recent >= rule.max_alerts_per_hour {
            warn!(rule = %rule.name, "hourly alert limit reached, throttling");
            return false;
        }

        true
    }

    /// Record a delivery outcome. Only called with the channels that
    /// actually succeeded; an empty set means every channel failed and the
    /// alert does not count as sent for throttling purposes.
    pub fn record_sent(
        &mut self,
        fingerprint: u64,
        channels: &BTreeSet<ChannelKind>,
        now: DateTime<Utc>,
    ) {
        if channels.is_empty() {
            return;
        }
        if let Some(alert) = self.active.get_mut(&fingerprint) {
            alert.last_sent_at = Some(now);
            alert.send_count += 1;
            alert.channels_sent.extend(channels.iter().copied());

            let times = self.sends.entry(alert.rule_name.clone()).or_default();
            times.push_back(now);
            let hour_ago = now - Duration::hours(1);
            while times.front().is_some_and(|&t| t <= hour_ago) {
                times.pop_front();
            }
        }
    }

    /// Acknowledge a firing alert. Does not stop re-evaluation or
    /// throttled re-notification.
    pub fn acknowledge(
        &mut self,
        fingerprint: u64,
        by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AlertError> {
        let alert = self
            .active
            .get_mut(&fingerprint)
            .ok_or(AlertError::NotFound(fingerprint))?;

        if alert.state != AlertState::Firing {
            return Err(AlertError::NotFiring {
                fingerprint,
                state: match alert.state {
                    AlertState::Acknowledged => "acknowledged",
                    AlertState::Suppressed => "suppressed",
                    _ => "resolved",
                },
            });
        }

        alert.state = AlertState::Acknowledged;
        alert.acknowledged_by = Some(by.into());
        alert.acknowledged_at = Some(now);
        info!(rule = %alert.rule_name, by = alert.acknowledged_by.as_deref(), "alert acknowledged");
        Ok(())
    }

    /// Mute an active alert; suppressed alerts resolve normally but are
    /// never re-delivered.
    pub fn suppress(&mut self, fingerprint: u64) -> Result<(), AlertError> {
        let alert = self
            .active
            .get_mut(&fingerprint)
            .ok_or(AlertError::NotFound(fingerprint))?;
        alert.state = AlertState::Suppressed;
        info!(rule = %alert.rule_name, "alert suppressed");
        Ok(())
    }

    /// Snapshot of all active alerts
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.active.values().cloned().collect()
    }

    /// Look up one active alert
    pub fn get(&self, fingerprint: u64) -> Option<&Alert> {
        self.active.get(&fingerprint)
    }

    /// Recently resolved alerts, most recent last
    pub fn resolved_history(&self) -> impl Iterator<Item = &Alert> {
        self.history.iter()
    }

    /// Counts by state and severity for the dashboard surface
    pub fn summary(&self) -> AlertSummary {
        let mut summary = AlertSummary {
            active: self.active.len(),
            resolved_total: self.history.len(),
            ..Default::default()
        };
        for alert in self.active.values() {
            match alert.state {
                AlertState::Firing => summary.firing += 1,
                AlertState::Acknowledged => summary.acknowledged += 1,
                AlertState::Suppressed => summary.suppressed += 1,
                AlertState::Resolved => {}
            }
            *summary.by_severity.entry(alert.severity).or_insert(0) += 1;
        }
        summary
    }
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new()
    }
}
