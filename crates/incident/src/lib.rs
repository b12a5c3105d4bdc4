//! Incident Lifecycle Management
//!
//! Creates incidents, drives them through a status state machine with an
//! append-ordered timeline, selects and executes runbooks, and schedules
//! cancellable escalation timers.

mod error;
mod incident;
mod manager;
mod policy;
mod runbook;

pub use error::IncidentError;
pub use incident::{
    Incident, IncidentSeverity, IncidentStatus, IncidentType, TimelineEntry, TimelineKind,
};
pub use manager::{IncidentManager, IncidentMetrics};
pub use policy::{Contact, ContactDirectory, EscalationPolicy, PolicyMatrix};
pub use runbook::{Runbook, RunbookLibrary};
