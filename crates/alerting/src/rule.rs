//! Alert Rule Definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alert severity, ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Label used in notification payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

/// Delivery channel tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
    Chat,
    Webhook,
}

impl ChannelKind {
    /// Label used in logs and template lookup
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
            ChannelKind::Chat => "chat",
            ChannelKind::Webhook => "webhook",
        }
    }
}

/// Threshold evaluation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// Fire when value > threshold
    Static,
    /// Fire when value > p95 * (1 + threshold/100)
    DynamicPercentile,
    /// Fire when |value - baseline| / baseline * 100 > threshold,
    /// baseline = mean of samples within the rule window
    PercentageChange,
    /// Fire when |value - mean| / stdev > sensitivity
    AnomalyZscore,
}

/// A configured alert rule bound to one metric series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique rule name
    pub name: String,
    /// Metric series this rule evaluates
    pub series: String,
    /// Severity assigned to alerts from this rule
    pub severity: Severity,
    /// Evaluation strategy
    pub kind: ThresholdKind,
    /// Threshold value (meaning depends on `kind`)
    pub threshold: f64,
    /// Baseline window for percentage-change, in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
    /// Z-score sensitivity for anomaly detection
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Evaluation interval in seconds
    #[serde(default = "default_eval_interval")]
    pub eval_interval_secs: u64,
    /// Condition must hold this long before the alert fires (0 = immediately)
    #[serde(default)]
    pub min_duration_secs: u64,
    /// Minimum seconds between repeat notifications
    #[serde(default = "default_throttle")]
    pub throttle_secs: u64,
    /// Maximum notifications per trailing hour
    #[serde(default = "default_max_per_hour")]
    pub max_alerts_per_hour: usize,
    /// Labels attached to alerts from this rule (sorted by key)
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Fallback channels when no routing rule matches
    #[serde(default)]
    pub channels: Vec<ChannelKind>,
    /// Whether this rule is evaluated at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_window_minutes() -> u32 {
    10
}

fn default_sensitivity() -> f64 {
    3.0
}

fn default_eval_interval() -> u64 {
    60
}

fn default_throttle() -> u64 {
    1800
}

fn default_max_per_hour() -> usize {
    10
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    /// Create a static-threshold rule with default timing knobs
    pub fn new(name: impl Into<String>, series: impl Into<String>, severity: Severity, threshold: f64) -> Self {
        Self {
            name: name.into(),
            series: series.into(),
            severity,
            kind: ThresholdKind::Static,
            threshold,
            window_minutes: default_window_minutes(),
            sensitivity: default_sensitivity(),
            eval_interval_secs: default_eval_interval(),
            min_duration_secs: 0,
            throttle_secs: default_throttle(),
            max_alerts_per_hour: default_max_per_hour(),
            labels: BTreeMap::new(),
            channels: Vec::new(),
            enabled: true,
        }
    }

    /// Set the evaluation strategy
    pub fn with_kind(mut self, kind: ThresholdKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the repeat-notification throttle
    pub fn with_throttle(mut self, secs: u64) -> Self {
        self.throttle_secs = secs;
        self
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Fingerprint for alerts raised by this rule
    pub fn fingerprint(&self) -> u64 {
        fingerprint(&self.name, &self.labels)
    }
}

/// Stable fingerprint over a rule name and its sorted label set.
///
/// FNV-1a so the value survives process restarts; `BTreeMap` iteration
/// provides the sorted label order.
pub fn fingerprint(rule_name: &str, labels: &BTreeMap<String, String>) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= b as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    };

    feed(rule_name.as_bytes());
    for (key, value) in labels {
        feed(b"\x1f");
        feed(key.as_bytes());
        feed(b"=");
        feed(value.as_bytes());
    }
    hash
}
