//! SLO Definitions and Error Budgets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SLO measurement window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
}

impl TimeWindow {
    /// Window length in seconds
    pub fn seconds(&self) -> u64 {
        match self {
            TimeWindow::Minute => 60,
            TimeWindow::Hour => 3600,
            TimeWindow::Day => 86_400,
            TimeWindow::Week => 7 * 86_400,
            TimeWindow::Month => 30 * 86_400,
            TimeWindow::Quarter => 90 * 86_400,
        }
    }
}

/// The measured quantity underlying an SLO
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliKind {
    /// Good events / total events (availability, error-rate SLIs)
    Ratio,
    /// Latency percentile against a threshold; degradation scales the SLI
    Latency {
        /// Target latency in milliseconds
        threshold_ms: f64,
    },
}

/// One cycle's raw SLI input, supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliObservation {
    /// Event counts for ratio SLIs
    Ratio { good: u64, total: u64 },
    /// Measured latency percentile for latency SLIs
    Latency { observed_ms: f64 },
}

/// A service-level objective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slo {
    /// Unique SLO name
    pub name: String,
    /// Owning service
    pub service: String,
    /// Underlying SLI definition
    pub sli: SliKind,
    /// Target percentage, e.g. 99.9
    pub target_pct: f64,
    /// Measurement window
    pub window: TimeWindow,
    /// Burn rate above which a burn-rate alert fires
    pub burn_rate_alert_threshold: f64,
}

impl Slo {
    /// Total error budget as a percentage (100 - target)
    pub fn error_budget_pct(&self) -> f64 {
        100.0 - self.target_pct
    }
}

/// Accumulated error-budget state for one SLO.
/// Reset only at window rollover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErrorBudget {
    /// Total budget in percentage points
    pub total_pct: f64,
    /// Budget consumed so far, capped at `total_pct`
    pub consumed_pct: f64,
    /// Current burn rate; 1.0 exhausts the budget exactly at window end
    pub burn_rate: f64,
    /// Estimated hours until exhaustion at the current burn rate
    pub hours_to_exhaustion: Option<f64>,
    /// Actual SLI percentage from the last evaluation
    pub last_sli_pct: f64,
    /// When the current window started
    pub window_started_at: DateTime<Utc>,
}

impl ErrorBudget {
    /// Fresh budget for an SLO window starting now
    pub fn new(slo: &Slo, now: DateTime<Utc>) -> Self {
        Self {
            total_pct: slo.error_budget_pct(),
            consumed_pct: 0.0,
            burn_rate: 0.0,
            hours_to_exhaustion: None,
            last_sli_pct: 100.0,
            window_started_at: now,
        }
    }

    /// Budget still available in percentage points
    pub fn remaining_pct(&self) -> f64 {
        (self.total_pct - self.consumed_pct).max(0.0)
    }

    /// Remaining budget as a percentage of the total budget (0-100)
    pub fn remaining_of_total(&self) -> f64 {
        if self.total_pct <= 0.0 {
            return 0.0;
        }
        self.remaining_pct() / self.total_pct * 100.0
    }

    /// Whether the budget is fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.remaining_pct() <= 0.0
    }
}
