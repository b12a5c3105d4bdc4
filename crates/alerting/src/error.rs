//! Alerting Error Types

use thiserror::Error;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum AlertError {
    /// No alert with the given fingerprint
    #[error("No active alert with fingerprint {0:#018x}")]
    NotFound(u64),

    /// Operation requires the alert to be firing
    #[error("Alert {fingerprint:#018x} is not firing (state: {state})")]
    NotFiring { fingerprint: u64, state: &'static str },
}
