//! Incident Records and Status Machine

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Incident severity, P1 most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncidentSeverity {
    P1,
    P2,
    P3,
    P4,
    P5,
}

impl IncidentSeverity {
    /// Label used in notifications
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::P1 => "P1",
            IncidentSeverity::P2 => "P2",
            IncidentSeverity::P3 => "P3",
            IncidentSeverity::P4 => "P4",
            IncidentSeverity::P5 => "P5",
        }
    }

    /// P1/P2 get the fastest-mitigation treatment
    pub fn is_major(&self) -> bool {
        matches!(self, IncidentSeverity::P1 | IncidentSeverity::P2)
    }
}

/// Incident lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Detected,
    Investigating,
    Identified,
    Monitoring,
    Resolved,
    Closed,
}

impl IncidentStatus {
    /// Whether work on the incident is still ongoing
    pub fn is_open(&self) -> bool {
        !matches!(self, IncidentStatus::Resolved | IncidentStatus::Closed)
    }

    /// Legal transitions. The common path is linear, but the three middle
    /// states may be set directly to reflect manual classification, and
    /// any open state may resolve.
    pub fn can_transition_to(&self, to: IncidentStatus) -> bool {
        if *self == to {
            return false;
        }
        match (self, to) {
            (IncidentStatus::Closed, _) => false,
            (IncidentStatus::Resolved, IncidentStatus::Closed) => true,
            (IncidentStatus::Resolved, _) => false,
            (_, IncidentStatus::Resolved) => true,
            (_, IncidentStatus::Closed) => false,
            (_, IncidentStatus::Detected) => false,
            (
                _,
                IncidentStatus::Investigating | IncidentStatus::Identified | IncidentStatus::Monitoring,
            ) => true,
        }
    }

    /// Label for timeline messages
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Identified => "identified",
            IncidentStatus::Monitoring => "monitoring",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        }
    }
}

/// Classification of what went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Outage,
    Performance,
    Security,
    DataLoss,
    Infrastructure,
    Api,
    Database,
    Network,
    ThirdParty,
    HumanError,
}

/// Kind of timeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Created,
    Acknowledged,
    StatusChange,
    Update,
    RunbooksSuggested,
    RunbookStarted,
    RunbookStep,
    RunbookCompleted,
    Escalated,
    Resolution,
}

/// One append-ordered timeline entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Wall-clock time of the entry
    pub at: DateTime<Utc>,
    /// What happened
    pub kind: TimelineKind,
    /// Free-text detail
    pub message: String,
    /// Actor, when one is known
    pub by: Option<String>,
}

/// A tracked incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Short generated id, e.g. `INC-3fa85f64`
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: IncidentSeverity,
    pub incident_type: IncidentType,
    pub status: IncidentStatus,
    /// Current escalation level, L1..L4
    pub escalation_level: u8,
    pub affected_services: Vec<String>,
    /// Operator who owns the incident
    pub assignee: Option<String>,
    /// Who or what detected it
    pub detected_by: String,
    /// Runbook executed against this incident, if any
    pub runbook_executed: Option<String>,
    pub resolution_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Strictly append-ordered by wall-clock time
    pub timeline: Vec<TimelineEntry>,
}

impl Incident {
    /// Create a new incident in `detected` state with a `created` entry
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: IncidentSeverity,
        incident_type: IncidentType,
        affected_services: Vec<String>,
        detected_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let detected_by = detected_by.into();
        let mut incident = Self {
            id: generate_id(),
            title: title.clone(),
            description: description.into(),
            severity,
            incident_type,
            status: IncidentStatus::Detected,
            escalation_level: 1,
            affected_services,
            assignee: None,
            detected_by: detected_by.clone(),
            runbook_executed: None,
            resolution_summary: None,
            created_at: now,
            detected_at: now,
            acknowledged_at: None,
            resolved_at: None,
            timeline: Vec::new(),
        };
        incident.log(
            TimelineKind::Created,
            format!("Incident created: {title}"),
            Some(detected_by),
            now,
        );
        incident
    }

    /// Append a timeline entry
    pub fn log(
        &mut self,
        kind: TimelineKind,
        message: impl Into<String>,
        by: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.timeline.push(TimelineEntry {
            at,
            kind,
            message: message.into(),
            by,
        });
    }

    /// Time to acknowledge, once acknowledged
    pub fn mtta(&self) -> Option<Duration> {
        self.acknowledged_at.map(|at| at - self.detected_at)
    }

    /// Time to resolve, once resolved
    pub fn mttr(&self) -> Option<Duration> {
        self.resolved_at.map(|at| at - self.detected_at)
    }

    /// Whether the incident is still open
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Short unique incident id
fn generate_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("INC-{}", &uuid[..8])
}
