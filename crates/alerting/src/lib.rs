//! Alerting Core
//!
//! Provides alert rule definitions, threshold evaluation over metric history,
//! and the fingerprint-keyed registry that owns active alerts.

mod alert;
mod error;
mod evaluator;
mod registry;
mod rule;

pub use alert::{Alert, AlertState};
pub use error::AlertError;
pub use evaluator::{dynamic_threshold, is_exceeded};
pub use registry::{AlertEvent, AlertRegistry, AlertSummary};
pub use rule::{fingerprint, AlertRule, ChannelKind, Severity, ThresholdKind};
