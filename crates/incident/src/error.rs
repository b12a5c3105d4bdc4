//! Incident Error Types

use crate::incident::IncidentStatus;
use thiserror::Error;

/// Errors from incident operations. Each is reported to the caller with no
/// partial mutation of the incident.
#[derive(Debug, Error)]
pub enum IncidentError {
    /// No incident with that id
    #[error("No incident with id {0}")]
    NotFound(String),

    /// The requested status change is not legal
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: IncidentStatus,
        to: IncidentStatus,
    },

    /// Acknowledge is only legal from `detected`
    #[error("Incident {id} cannot be acknowledged from {status:?}")]
    NotAcknowledgeable { id: String, status: IncidentStatus },

    /// No runbook with that name in the library
    #[error("Unknown runbook: {0}")]
    UnknownRunbook(String),

    /// The incident is closed and can no longer be acted on
    #[error("Incident {0} is closed")]
    Closed(String),

    /// A thread panicked while holding the store lock
    #[error("Incident store lock poisoned")]
    StorePoisoned,
}
