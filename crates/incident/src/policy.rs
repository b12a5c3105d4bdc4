//! Escalation Policies and Contacts

use crate::incident::IncidentSeverity;
use alerting::ChannelKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Escalation behavior for one severity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Escalation chain, e.g. [1, 2, 3, 4] for L1 through L4
    pub levels: Vec<u8>,
    /// Minutes before an unresolved incident auto-escalates; 0 disables
    pub timeout_minutes: u64,
    /// Whether management is included in escalation notifications
    pub notify_management: bool,
}

impl EscalationPolicy {
    /// Next level in the chain after `current`, if any
    pub fn next_level(&self, current: u8) -> Option<u8> {
        self.levels.iter().copied().find(|&l| l > current)
    }
}

/// Static severity -> policy matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyMatrix {
    policies: HashMap<IncidentSeverity, EscalationPolicy>,
}

impl PolicyMatrix {
    /// Build a matrix from explicit entries
    pub fn new(policies: HashMap<IncidentSeverity, EscalationPolicy>) -> Self {
        Self { policies }
    }

    /// Policy for a severity; severities without an entry never auto-escalate
    pub fn policy(&self, severity: IncidentSeverity) -> EscalationPolicy {
        self.policies.get(&severity).cloned().unwrap_or(EscalationPolicy {
            levels: vec![1],
            timeout_minutes: 0,
            notify_management: false,
        })
    }
}

impl Default for PolicyMatrix {
    fn default() -> Self {
        use IncidentSeverity::*;
        let mut policies = HashMap::new();
        policies.insert(
            P1,
            EscalationPolicy {
                levels: vec![1, 2, 3, 4],
                timeout_minutes: 15,
                notify_management: true,
            },
        );
        policies.insert(
            P2,
            EscalationPolicy {
                levels: vec![1, 2, 3],
                timeout_minutes: 30,
                notify_management: true,
            },
        );
        policies.insert(
            P3,
            EscalationPolicy {
                levels: vec![1, 2],
                timeout_minutes: 60,
                notify_management: false,
            },
        );
        policies.insert(
            P4,
            EscalationPolicy {
                levels: vec![1],
                timeout_minutes: 0,
                notify_management: false,
            },
        );
        policies.insert(
            P5,
            EscalationPolicy {
                levels: vec![1],
                timeout_minutes: 0,
                notify_management: false,
            },
        );
        Self { policies }
    }
}

/// One reachable person or paging target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Display name
    pub name: String,
    /// Channel to reach them on
    pub channel: ChannelKind,
    /// Channel-specific address (email, number, webhook URL)
    pub address: String,
}

/// Who to notify immediately per severity and per escalation level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactDirectory {
    /// Immediate-response contacts per severity
    immediate: HashMap<IncidentSeverity, Vec<Contact>>,
    /// On-call contacts per escalation level
    levels: HashMap<u8, Vec<Contact>>,
    /// Management chain, notified on escalation when the policy says so
    management: Vec<Contact>,
}

impl ContactDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register immediate contacts for a severity
    pub fn with_immediate(mut self, severity: IncidentSeverity, contacts: Vec<Contact>) -> Self {
        self.immediate.insert(severity, contacts);
        self
    }

    /// Register contacts for an escalation level
    pub fn with_level(mut self, level: u8, contacts: Vec<Contact>) -> Self {
        self.levels.insert(level, contacts);
        self
    }

    /// Immediate-response contacts for a severity
    pub fn immediate(&self, severity: IncidentSeverity) -> &[Contact] {
        self.immediate.get(&severity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Contacts at an escalation level
    pub fn at_level(&self, level: u8) -> &[Contact] {
        self.levels.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Register the management chain
    pub fn with_management(mut self, contacts: Vec<Contact>) -> Self {
        self.management = contacts;
        self
    }

    /// Management contacts
    pub fn management(&self) -> &[Contact] {
        &self.management
    }
}
