//! Routing Rules and Dispatch

use crate::channel::{Notifier, NotifyError};
use crate::template::MessageTemplate;
use alerting::{Alert, ChannelKind, Severity};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Business-hours definition in a fixed reference timezone
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusinessHours {
    /// First business hour (inclusive), 0-23
    pub start_hour: u32,
    /// End hour (exclusive), 0-23
    pub end_hour: u32,
    /// Whole-hour offset of the reference timezone from UTC
    pub utc_offset_hours: i32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 18,
            utc_offset_hours: 0,
        }
    }
}

impl BusinessHours {
    /// Mon-Fri within the configured hour range, in the reference timezone
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = now + Duration::hours(self.utc_offset_hours as i64);
        let weekday = matches!(
            local.weekday(),
            Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri
        );
        weekday && local.hour() >= self.start_hour && local.hour() < self.end_hour
    }
}

/// One routing rule; rules are consulted in order and the first match wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Rule name for logs
    pub name: String,
    /// Optional severity filter
    #[serde(default)]
    pub severities: Option<Vec<Severity>>,
    /// Match only during business hours
    #[serde(default)]
    pub business_hours_only: bool,
    /// Match only outside business hours
    #[serde(default)]
    pub after_hours_only: bool,
    /// Exact-match label requirements
    #[serde(default)]
    pub label_equals: BTreeMap<String, String>,
    /// Substring pattern over the alert's rule name
    #[serde(default)]
    pub rule_name_pattern: Option<String>,
    /// Channels to deliver on
    pub channels: Vec<ChannelKind>,
    /// Escalation map: minutes elapsed -> additional channel set
    #[serde(default)]
    pub escalation: BTreeMap<u32, Vec<ChannelKind>>,
}

impl RoutingRule {
    fn matches(&self, alert: &Alert, in_business_hours: bool) -> bool {
        if let Some(severities) = &self.severities {
            if !severities.contains(&alert.severity) {
                return false;
            }
        }
        if self.business_hours_only && !in_business_hours {
            return false;
        }
        if self.after_hours_only && in_business_hours {
            return false;
        }
        if let Some(pattern) = &self.rule_name_pattern {
            if !alert.rule_name.contains(pattern.as_str()) {
                return false;
            }
        }
        for (key, value) in &self.label_equals {
            if alert.labels.get(key) != Some(value) {
                return false;
            }
        }
        true
    }
}

/// Result of one dispatch fan-out
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Channels that accepted the message
    pub channels_sent: BTreeSet<ChannelKind>,
    /// Channels that failed; failures never roll back alert state
    pub failed: Vec<ChannelKind>,
}

/// Maps alerts to channels and owns the notifier implementations
pub struct Router {
    rules: Vec<RoutingRule>,
    templates: HashMap<ChannelKind, MessageTemplate>,
    notifiers: HashMap<ChannelKind, Box<dyn Notifier>>,
    hours: BusinessHours,
    /// Channels used when no routing rule matches
    default_channels: Vec<ChannelKind>,
}

impl Router {
    /// Create a router with the stock templates
    pub fn new(rules: Vec<RoutingRule>, hours: BusinessHours) -> Self {
        Self {
            rules,
            templates: default_templates(),
            notifiers: HashMap::new(),
            hours,
            default_channels: vec![ChannelKind::Email],
        }
    }

    /// Replace a channel's template
    pub fn with_template(mut self, kind: ChannelKind, template: MessageTemplate) -> Self {
        self.templates.insert(kind, template);
        self
    }

    /// Register a notifier implementation, resolved once at startup
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.insert(notifier.kind(), notifier);
        self
    }

    /// Set the channels used when no routing rule matches
    pub fn with_default_channels(mut self, channels: Vec<ChannelKind>) -> Self {
        self.default_channels = channels;
        self
    }

    /// Whether a template exists for every channel any rule routes to
    pub fn channels_covered(&self) -> Result<(), ChannelKind> {
        let mut routed: BTreeSet<ChannelKind> = self.default_channels.iter().copied().collect();
        for rule in &self.rules {
            routed.extend(rule.channels.iter().copied());
            for channels in rule.escalation.values() {
                routed.extend(channels.iter().copied());
            }
        }
        for kind in routed {
            if !self.templates.contains_key(&kind) {
                return Err(kind);
            }
        }
        Ok(())
    }

    fn matched_rule(&self, alert: &Alert, now: DateTime<Utc>) -> Option<&RoutingRule> {
        let in_hours = self.hours.contains(now);
        self.rules.iter().find(|rule| rule.matches(alert, in_hours))
    }

    /// Channel set and rendered messages for one alert.
    /// The first matching routing rule determines the channels.
    pub fn route(&self, alert: &Alert, now: DateTime<Utc>) -> BTreeMap<ChannelKind, (String, String)> {
        self.route_with_fallback(alert, &[], now)
    }

    /// Like [`route`](Self::route), but an unrouted alert falls back to the
    /// given channels before the router-wide defaults. The alert rule's own
    /// channel list goes here.
    pub fn route_with_fallback(
        &self,
        alert: &Alert,
        fallback: &[ChannelKind],
        now: DateTime<Utc>,
    ) -> BTreeMap<ChannelKind, (String, String)> {
        let channels: &[ChannelKind] = match self.matched_rule(alert, now) {
            Some(rule) => {
                debug!(rule = %rule.name, alert = %alert.rule_name, "routing rule matched");
                &rule.channels
            }
            None if !fallback.is_empty() => fallback,
            None => &self.default_channels,
        };

        let mut messages = BTreeMap::new();
        for &kind in channels {
            match self.templates.get(&kind) {
                Some(template) => {
                    messages.insert(kind, template.render(alert, now));
                }
                None => warn!(channel = kind.as_str(), "no template for routed channel"),
            }
        }
        messages
    }

    /// Deliver an alert on every routed channel. Failures are logged per
    /// channel and reported in the outcome; they never abort the fan-out.
    pub fn dispatch(&self, alert: &Alert, now: DateTime<Utc>) -> DispatchOutcome {
        self.dispatch_with_fallback(alert, &[], now)
    }

    /// Deliver on the routed channels, with a fallback channel set for
    /// unrouted alerts. See [`route_with_fallback`](Self::route_with_fallback).
    pub fn dispatch_with_fallback(
        &self,
        alert: &Alert,
        fallback: &[ChannelKind],
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for (kind, (title, body)) in self.route_with_fallback(alert, fallback, now) {
            match self.notify(kind, &title, &body) {
                Ok(()) => {
                    outcome.channels_sent.insert(kind);
                }
                Err(e) => {
                    warn!(channel = kind.as_str(), error = %e, "delivery failed");
                    outcome.failed.push(kind);
                }
            }
        }
        outcome
    }

    /// Deliver to an explicit channel set, bypassing rule matching.
    /// Used for escalation targets on top of the routed channels.
    pub fn dispatch_channels(
        &self,
        alert: &Alert,
        channels: &BTreeSet<ChannelKind>,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for &kind in channels {
            let Some(template) = self.templates.get(&kind) else {
                warn!(channel = kind.as_str(), "no template for channel");
                continue;
            };
            let (title, body) = template.render(alert, now);
            match self.notify(kind, &title, &body) {
                Ok(()) => {
                    outcome.channels_sent.insert(kind);
                }
                Err(e) => {
                    warn!(channel = kind.as_str(), error = %e, "delivery failed");
                    outcome.failed.push(kind);
                }
            }
        }
        outcome
    }

    /// Union of the matched rule's escalation channel sets whose minute
    /// threshold has elapsed
    pub fn escalation_channels(
        &self,
        alert: &Alert,
        minutes_elapsed: u32,
        now: DateTime<Utc>,
    ) -> BTreeSet<ChannelKind> {
        let mut channels = BTreeSet::new();
        if let Some(rule) = self.matched_rule(alert, now) {
            for (&after_minutes, escalated) in &rule.escalation {
                if after_minutes <= minutes_elapsed {
                    channels.extend(escalated.iter().copied());
                }
            }
        }
        channels
    }

    /// Direct single-channel send, bypassing routing rules
    pub fn notify(&self, kind: ChannelKind, title: &str, body: &str) -> Result<(), NotifyError> {
        match self.notifiers.get(&kind) {
            Some(notifier) => notifier.send(title, body),
            None => Err(NotifyError::UnknownChannel(kind.as_str())),
        }
    }
}

/// Stock templates per channel kind
pub fn default_templates() -> HashMap<ChannelKind, MessageTemplate> {
    let mut templates = HashMap::new();
    templates.insert(
        ChannelKind::Email,
        MessageTemplate {
            title: "[{severity}] {rule}".to_string(),
            body: "Alert {rule} is firing for {duration}.\nValue: {value} (threshold {threshold})\nLabels: {labels}".to_string(),
        },
    );
    templates.insert(
        ChannelKind::Sms,
        MessageTemplate {
            title: "[{severity}] {rule}: {value} > {threshold}".to_string(),
            body: String::new(),
        },
    );
    templates.insert(
        ChannelKind::Chat,
        MessageTemplate {
            title: ":rotating_light: [{severity}] {rule}".to_string(),
            body: "*{rule}* firing for {duration} — value {value}, threshold {threshold} ({labels})".to_string(),
        },
    );
    templates.insert(
        ChannelKind::Webhook,
        MessageTemplate {
            title: "{rule}".to_string(),
            body: "{severity} {rule} value={value} threshold={threshold} duration={duration}".to_string(),
        },
    );
    templates
}
