//! SLO / Error-Budget Manager
//!
//! Holds SLO definitions, computes the current SLI per evaluation cycle,
//! accumulates error-budget consumption, and raises burn-rate and
//! budget-exhaustion signals. Signals are fed through the same alert
//! registry and router as metric-threshold alerts; SLOs are virtual alert
//! sources, not a separate notification path.

mod budget;
mod manager;

pub use budget::{ErrorBudget, SliKind, SliObservation, Slo, TimeWindow};
pub use manager::{SloError, SloManager, SloSignal, SloStatus};
