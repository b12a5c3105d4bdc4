//! Correlation Engine
//!
//! Groups co-occurring alerts into logical incidents-of-alerts using
//! time-window and pattern rules. Rules are evaluated in declaration order
//! and the first matching rule claims its alerts; the ordering is part of
//! the observable contract, not an implementation detail.

use alerting::{Alert, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Name assigned to the leftover group
pub const UNCORRELATED_GROUP: &str = "uncorrelated";

/// A single correlation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationRule {
    /// Group name assigned to matched alerts
    pub name: String,
    /// Alerts must have started within this many minutes of `now`
    pub time_window_minutes: u32,
    /// Minimum matching alerts before a group forms
    pub min_alerts: usize,
    /// Optional severity filter
    #[serde(default)]
    pub severities: Option<Vec<Severity>>,
    /// Label patterns: every entry must match as a substring of the
    /// alert's value for that label
    #[serde(default)]
    pub label_patterns: BTreeMap<String, String>,
    /// Substring pattern over the rule name
    #[serde(default)]
    pub rule_name_pattern: Option<String>,
}

impl CorrelationRule {
    fn matches(&self, alert: &Alert, cutoff: DateTime<Utc>) -> bool {
        if alert.started_at < cutoff {
            return false;
        }
        if let Some(severities) = &self.severities {
            if !severities.contains(&alert.severity) {
                return false;
            }
        }
        if let Some(pattern) = &self.rule_name_pattern {
            if !alert.rule_name.contains(pattern.as_str()) {
                return false;
            }
        }
        for (key, pattern) in &self.label_patterns {
            match alert.labels.get(key) {
                Some(value) if value.contains(pattern.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

/// A correlated group of alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertGroup {
    /// Name of the matching rule, or `uncorrelated`
    pub rule_name: String,
    /// Alerts claimed by this group
    pub alerts: Vec<Alert>,
    /// When the group was formed
    pub formed_at: DateTime<Utc>,
}

impl AlertGroup {
    /// Most severe alert severity in the group
    pub fn max_severity(&self) -> Option<Severity> {
        self.alerts.iter().map(|a| a.severity).min()
    }

    /// Distinct services named by the alerts' `service` label
    pub fn affected_services(&self) -> Vec<String> {
        let mut services: Vec<String> = self
            .alerts
            .iter()
            .filter_map(|a| a.labels.get("service").cloned())
            .collect();
        services.sort();
        services.dedup();
        services
    }
}

/// Groups new alerts per the configured rules
pub struct CorrelationEngine {
    rules: Vec<CorrelationRule>,
}

impl CorrelationEngine {
    /// Create an engine; rule order is significant
    pub fn new(rules: Vec<CorrelationRule>) -> Self {
        Self { rules }
    }

    /// Correlate a batch of newly created alerts.
    ///
    /// First matching rule wins and removes its alerts from the pool.
    /// Anything left over lands in a synthetic `uncorrelated` group.
    pub fn correlate(&self, alerts: &[Alert], now: DateTime<Utc>) -> Vec<AlertGroup> {
        let mut pool: Vec<Alert> = alerts.to_vec();
        let mut groups = Vec::new();

        for rule in &self.rules {
            let cutoff = now - Duration::minutes(rule.time_window_minutes as i64);
            let matched: Vec<usize> = pool
                .iter()
                .enumerate()
                .filter(|(_, alert)| rule.matches(alert, cutoff))
                .map(|(i, _)| i)
                .collect();

            if matched.len() < rule.min_alerts {
                debug!(rule = %rule.name, matched = matched.len(), "below minimum, no group");
                continue;
            }

            let mut claimed = Vec::with_capacity(matched.len());
            for &i in matched.iter().rev() {
                claimed.push(pool.remove(i));
            }
            claimed.reverse();

            info!(rule = %rule.name, count = claimed.len(), "correlated alert group formed");
            groups.push(AlertGroup {
                rule_name: rule.name.clone(),
                alerts: claimed,
                formed_at: now,
            });
        }

        if !pool.is_empty() {
            groups.push(AlertGroup {
                rule_name: UNCORRELATED_GROUP.to_string(),
                alerts: pool,
                formed_at: now,
            });
        }

        groups
    }
}

/// Keep only the first occurrence per fingerprint. Idempotent.
pub fn dedupe(alerts: &[Alert]) -> Vec<Alert> {
    let mut seen = HashSet::new();
    alerts
        .iter()
        .filter(|a| seen.insert(a.fingerprint))
        .cloned()
        .collect()
}
