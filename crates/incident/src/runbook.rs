//! Runbook Library

use crate::incident::{IncidentSeverity, IncidentType};
use serde::{Deserialize, Serialize};

/// A response procedure, read-only at runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runbook {
    /// Unique runbook name
    pub name: String,
    /// Incident types this runbook applies to
    pub incident_types: Vec<IncidentType>,
    /// Severities this runbook applies to
    pub severities: Vec<IncidentSeverity>,
    /// Ordered response steps
    pub steps: Vec<String>,
    /// Estimated duration in minutes
    pub estimated_minutes: u32,
    /// Whether the runbook can run without a human
    pub automatable: bool,
}

/// Static catalogue of runbooks
pub struct RunbookLibrary {
    runbooks: Vec<Runbook>,
}

impl RunbookLibrary {
    /// Create a library from a fixed catalogue
    pub fn new(runbooks: Vec<Runbook>) -> Self {
        Self { runbooks }
    }

    /// Look up a runbook by name
    pub fn get(&self, name: &str) -> Option<&Runbook> {
        self.runbooks.iter().find(|r| r.name == name)
    }

    /// All runbooks applicable to the given type and severity.
    /// Sorted fastest-first for P1/P2 (fastest mitigation first),
    /// catalogue order otherwise.
    pub fn find_applicable(&self, incident_type: IncidentType, severity: IncidentSeverity) -> Vec<&Runbook> {
        let mut applicable: Vec<&Runbook> = self
            .runbooks
            .iter()
            .filter(|r| r.incident_types.contains(&incident_type) && r.severities.contains(&severity))
            .collect();
        if severity.is_major() {
            applicable.sort_by_key(|r| r.estimated_minutes);
        }
        applicable
    }

    /// Stock catalogue covering the common response procedures
    pub fn default_catalogue() -> Self {
        use IncidentSeverity::*;
        use IncidentType::*;

        Self::new(vec![
            Runbook {
                name: "restart_service".to_string(),
                incident_types: vec![Outage, Api, Performance],
                severities: vec![P1, P2, P3],
                steps: vec![
                    "Identify the failing service instance".to_string(),
                    "Drain traffic from the instance".to_string(),
                    "Restart the service process".to_string(),
                    "Verify health checks pass".to_string(),
                    "Restore traffic".to_string(),
                ],
                estimated_minutes: 10,
                automatable: true,
            },
            Runbook {
                name: "failover_database".to_string(),
                incident_types: vec![Database, Outage],
                severities: vec![P1, P2],
                steps: vec![
                    "Confirm primary is unhealthy".to_string(),
                    "Promote the replica".to_string(),
                    "Repoint application connection strings".to_string(),
                    "Verify replication lag is zero".to_string(),
                ],
                estimated_minutes: 20,
                automatable: true,
            },
            Runbook {
                name: "scale_out_capacity".to_string(),
                incident_types: vec![Performance, Infrastructure],
                severities: vec![P1, P2, P3, P4],
                steps: vec![
                    "Review saturation dashboards".to_string(),
                    "Add instances to the affected pool".to_string(),
                    "Confirm latency returns to baseline".to_string(),
                ],
                estimated_minutes: 15,
                automatable: true,
            },
            Runbook {
                name: "rotate_credentials".to_string(),
                incident_types: vec![Security],
                severities: vec![P1, P2, P3],
                steps: vec![
                    "Revoke the exposed credentials".to_string(),
                    "Issue replacements from the vault".to_string(),
                    "Roll dependent services".to_string(),
                    "Audit access logs for misuse".to_string(),
                ],
                estimated_minutes: 45,
                automatable: false,
            },
            Runbook {
                name: "restore_from_backup".to_string(),
                incident_types: vec![DataLoss, Database],
                severities: vec![P1, P2],
                steps: vec![
                    "Freeze writes to the affected dataset".to_string(),
                    "Identify the last good backup".to_string(),
                    "Restore into a staging target".to_string(),
                    "Validate and swap in the restored data".to_string(),
                ],
                estimated_minutes: 90,
                automatable: false,
            },
            Runbook {
                name: "engage_vendor_support".to_string(),
                incident_types: vec![ThirdParty, Network],
                severities: vec![P1, P2, P3, P4, P5],
                steps: vec![
                    "Confirm the fault is outside our boundary".to_string(),
                    "Open a vendor ticket with evidence".to_string(),
                    "Enable the degraded-mode fallback".to_string(),
                ],
                estimated_minutes: 30,
                automatable: false,
            },
        ])
    }
}
