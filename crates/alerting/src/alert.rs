//! Alert Records

use crate::rule::{ChannelKind, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Lifecycle state of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Condition currently holds
    Firing,
    /// Condition cleared
    Resolved,
    /// Firing, but an operator has taken ownership
    Acknowledged,
    /// Firing, but manually muted
    Suppressed,
}

/// A single alert, keyed by fingerprint in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Stable hash of (rule name, sorted labels)
    pub fingerprint: u64,
    /// Rule that raised the alert
    pub rule_name: String,
    /// Severity inherited from the rule
    pub severity: Severity,
    /// Current state
    pub state: AlertState,
    /// Metric value at the last evaluation
    pub metric_value: f64,
    /// Effective threshold at the last evaluation
    pub threshold: f64,
    /// Labels copied from the rule
    pub labels: BTreeMap<String, String>,
    /// When the alert started firing
    pub started_at: DateTime<Utc>,
    /// Last successful notification time
    pub last_sent_at: Option<DateTime<Utc>>,
    /// When the condition cleared
    pub resolved_at: Option<DateTime<Utc>>,
    /// Operator who acknowledged, if any
    pub acknowledged_by: Option<String>,
    /// When the alert was acknowledged
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Number of notifications sent
    pub send_count: u32,
    /// Channels that have received this alert
    pub channels_sent: BTreeSet<ChannelKind>,
}

impl Alert {
    /// Whether the alert still counts as active (not resolved)
    pub fn is_active(&self) -> bool {
        self.state != AlertState::Resolved
    }

    /// How long the alert has been firing as of `now`
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.started_at
    }
}
