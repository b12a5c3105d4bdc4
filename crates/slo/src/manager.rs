//! SLO Evaluation Cycles

use crate::budget::{ErrorBudget, SliKind, SliObservation, Slo, TimeWindow};
use alerting::Severity;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Remaining-budget percentages that trigger exhaustion signals
const BUDGET_CRITICAL_PCT: f64 = 10.0;
const BUDGET_WARNING_PCT: f64 = 25.0;

/// SLO evaluation errors
#[derive(Debug, Error)]
pub enum SloError {
    /// No SLO registered under that name
    #[error("Unknown SLO: {0}")]
    Unknown(String),

    /// Observation shape does not match the SLI kind
    #[error("SLO {slo} expects a {expected} observation")]
    ObservationMismatch { slo: String, expected: &'static str },
}

/// A budget-related alert signal raised during evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SloSignal {
    /// Burn rate exceeded the SLO's alerting threshold
    BurnRate {
        slo: String,
        burn_rate: f64,
        threshold: f64,
    },
    /// Remaining budget below the warning line
    BudgetWarning { slo: String, remaining_of_total: f64 },
    /// Remaining budget below the critical line
    BudgetCritical { slo: String, remaining_of_total: f64 },
}

impl SloSignal {
    /// SLO name the signal refers to
    pub fn slo_name(&self) -> &str {
        match self {
            SloSignal::BurnRate { slo, .. }
            | SloSignal::BudgetWarning { slo, .. }
            | SloSignal::BudgetCritical { slo, .. } => slo,
        }
    }

    /// Severity when fed into the alert registry
    pub fn severity(&self) -> Severity {
        match self {
            SloSignal::BurnRate { .. } => Severity::High,
            SloSignal::BudgetWarning { .. } => Severity::Medium,
            SloSignal::BudgetCritical { .. } => Severity::Critical,
        }
    }
}

/// Snapshot of one SLO for the query surface
#[derive(Debug, Clone, Serialize)]
pub struct SloStatus {
    pub name: String,
    pub service: String,
    pub target_pct: f64,
    pub current_sli_pct: f64,
    pub meeting_target: bool,
    pub budget: ErrorBudget,
}

/// Owns SLO definitions and their budgets
pub struct SloManager {
    slos: HashMap<String, Slo>,
    budgets: HashMap<String, ErrorBudget>,
}

impl SloManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            slos: HashMap::new(),
            budgets: HashMap::new(),
        }
    }

    /// Register an SLO; its budget window starts at `now`
    pub fn add_slo(&mut self, slo: Slo, now: DateTime<Utc>) {
        info!(slo = %slo.name, target = slo.target_pct, "registered SLO");
        self.budgets.insert(slo.name.clone(), ErrorBudget::new(&slo, now));
        self.slos.insert(slo.name.clone(), slo);
    }

    /// Names of all registered SLOs
    pub fn slo_names(&self) -> Vec<String> {
        self.slos.keys().cloned().collect()
    }

    /// Definition of one registered SLO
    pub fn slo(&self, name: &str) -> Option<&Slo> {
        self.slos.get(name)
    }

    /// Current status for one SLO
    pub fn status(&self, name: &str) -> Option<SloStatus> {
        let slo = self.slos.get(name)?;
        let budget = self.budgets.get(name)?;
        Some(SloStatus {
            name: slo.name.clone(),
            service: slo.service.clone(),
            target_pct: slo.target_pct,
            current_sli_pct: budget.last_sli_pct,
            meeting_target: budget.last_sli_pct >= slo.target_pct,
            budget: *budget,
        })
    }

    /// Run one evaluation cycle for an SLO.
    ///
    /// `cycle_secs` is the length of the evaluation cycle; consumption is
    /// normalized against the SLO window so a full window of sustained
    /// violation at burn rate 1.0 consumes exactly the whole budget.
    pub fn evaluate(
        &mut self,
        name: &str,
        observation: SliObservation,
        cycle_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<SloSignal>, SloError> {
        let Self { slos, budgets } = self;
        let slo = slos
            .get(name)
            .ok_or_else(|| SloError::Unknown(name.to_string()))?;
        let actual_pct = sli_value(slo, observation)?;

        let budget = budgets
            .entry(name.to_string())
            .or_insert_with(|| ErrorBudget::new(slo, now));

        // Window rollover is the only thing that resets the budget
        let window = Duration::seconds(slo.window.seconds() as i64);
        if now - budget.window_started_at >= window {
            debug!(slo = name, "budget window rolled over");
            *budget = ErrorBudget::new(slo, now);
        }

        let shortfall = (slo.target_pct - actual_pct).max(0.0);
        let time_factor = cycle_secs as f64 / slo.window.seconds() as f64;
        budget.consumed_pct = (budget.consumed_pct + shortfall * time_factor).min(budget.total_pct);
        budget.last_sli_pct = actual_pct;

        budget.burn_rate = if budget.total_pct > 0.0 {
            shortfall / budget.total_pct
        } else {
            0.0
        };

        budget.hours_to_exhaustion = if budget.burn_rate > 0.0 {
            let remaining_fraction = budget.remaining_pct() / budget.total_pct;
            Some(remaining_fraction / budget.burn_rate * slo.window.seconds() as f64 / 3600.0)
        } else {
            None
        };

        let mut signals = Vec::new();
        if budget.burn_rate > slo.burn_rate_alert_threshold {
            warn!(slo = name, burn_rate = budget.burn_rate, "burn rate above threshold");
            signals.push(SloSignal::BurnRate {
                slo: name.to_string(),
                burn_rate: budget.burn_rate,
                threshold: slo.burn_rate_alert_threshold,
            });
        }

        let remaining = budget.remaining_of_total();
        if remaining < BUDGET_CRITICAL_PCT {
            warn!(slo = name, remaining, "error budget nearly exhausted");
            signals.push(SloSignal::BudgetCritical {
                slo: name.to_string(),
                remaining_of_total: remaining,
            });
        } else if remaining < BUDGET_WARNING_PCT {
            signals.push(SloSignal::BudgetWarning {
                slo: name.to_string(),
                remaining_of_total: remaining,
            });
        }

        Ok(signals)
    }
}

impl Default for SloManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Actual SLI percentage for one observation
fn sli_value(slo: &Slo, observation: SliObservation) -> Result<f64, SloError> {
    match (slo.sli, observation) {
        (SliKind::Ratio, SliObservation::Ratio { good, total }) => {
            if total == 0 {
                // No events means no failures
                Ok(100.0)
            } else {
                Ok(good as f64 / total as f64 * 100.0)
            }
        }
        (SliKind::Latency { threshold_ms }, SliObservation::Latency { observed_ms }) => {
            if observed_ms <= threshold_ms {
                Ok(100.0)
            } else {
                // Linear degradation, reaching 0 at double the threshold
                Ok((100.0 - (observed_ms - threshold_ms) / threshold_ms * 100.0).max(0.0))
            }
        }
        (SliKind::Ratio, _) => Err(SloError::ObservationMismatch {
            slo: slo.name.clone(),
            expected: "ratio",
        }),
        (SliKind::Latency { .. }, _) => Err(SloError::ObservationMismatch {
            slo: slo.name.clone(),
            expected: "latency",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_secs)
    }

    fn availability_slo() -> Slo {
        Slo {
            name: "api_availability".to_string(),
            service: "api".to_string(),
            sli: SliKind::Ratio,
            target_pct: 99.9,
            window: TimeWindow::Month,
            burn_rate_alert_threshold: 2.0,
        }
    }

    #[test]
    fn test_meeting_target_consumes_nothing() {
        let mut manager = SloManager::new();
        manager.add_slo(availability_slo(), ts(0));

        let signals = manager
            .evaluate(
                "api_availability",
                SliObservation::Ratio { good: 99_950, total: 100_000 },
                300,
                ts(300),
            )
            .unwrap();

        assert!(signals.is_empty());
        let status = manager.status("api_availability").unwrap();
        assert!(status.meeting_target);
        assert_eq!(status.budget.consumed_pct, 0.0);
        assert_eq!(status.budget.burn_rate, 0.0);
        assert!(status.budget.hours_to_exhaustion.is_none());
    }

    /// Service getting strictly worse means the burn rate never decreases.
    #[test]
    fn test_burn_rate_monotonic_as_sli_degrades() {
        let mut manager = SloManager::new();
        manager.add_slo(availability_slo(), ts(0));

        let mut last_burn = 0.0;
        for (i, good) in [99_900u64, 99_800, 99_500, 99_000, 98_000].iter().enumerate() {
            manager
                .evaluate(
                    "api_availability",
                    SliObservation::Ratio { good: *good, total: 100_000 },
                    300,
                    ts((i as i64 + 1) * 300),
                )
                .unwrap();
            let burn = manager.status("api_availability").unwrap().budget.burn_rate;
            assert!(burn >= last_burn, "burn rate decreased: {burn} < {last_burn}");
            last_burn = burn;
        }
        assert!(last_burn > 1.0);
    }

    /// Scenario: 99.0% sustained against a 99.9% target over a 30-day
    /// window exhausts the 0.1% budget well before window end, with
    /// hours-to-exhaustion decreasing every cycle until the critical signal.
    #[test]
    fn test_sustained_violation_exhausts_budget() {
        let mut manager = SloManager::new();
        manager.add_slo(availability_slo(), ts(0));

        let cycle_secs = 300;
        let mut last_tte = f64::INFINITY;
        let mut critical_at_cycle = None;

        for i in 1..=1100i64 {
            let signals = manager
                .evaluate(
                    "api_availability",
                    SliObservation::Ratio { good: 99_000, total: 100_000 },
                    cycle_secs,
                    ts(i * cycle_secs as i64),
                )
                .unwrap();

            let budget = manager.status("api_availability").unwrap().budget;
            if !budget.is_exhausted() {
                let tte = budget.hours_to_exhaustion.unwrap();
                assert!(tte < last_tte, "time to exhaustion did not decrease");
                last_tte = tte;
            }

            // Burn rate 9.0 exceeds the 2.0 threshold every cycle
            assert!(signals.iter().any(|s| matches!(s, SloSignal::BurnRate { .. })));
            if critical_at_cycle.is_none()
                && signals.iter().any(|s| matches!(s, SloSignal::BudgetCritical { .. }))
            {
                critical_at_cycle = Some(i);
            }
        }

        // Budget of 0.1% at 0.9 shortfall * 300s/30d per cycle: exhausted
        // near cycle 960, far inside the 8640-cycle window
        let critical = critical_at_cycle.expect("critical signal never fired");
        assert!(critical < 1000);
        assert!(manager.status("api_availability").unwrap().budget.is_exhausted());
    }

    #[test]
    fn test_budget_warning_then_critical_thresholds() {
        let slo = Slo {
            window: TimeWindow::Hour,
            ..availability_slo()
        };
        let mut manager = SloManager::new();
        manager.add_slo(slo, ts(0));

        // Shortfall of 0.096 over 5-minute cycles in an hour window burns
        // 8% of the budget per cycle: warning at cycle 10, critical at 12
        let mut saw_warning = false;
        let mut saw_critical = false;
        for i in 1..=12i64 {
            let signals = manager
                .evaluate(
                    "api_availability",
                    SliObservation::Ratio { good: 99_804, total: 100_000 },
                    300,
                    ts(i * 300),
                )
                .unwrap();
            saw_warning |= signals.iter().any(|s| matches!(s, SloSignal::BudgetWarning { .. }));
            saw_critical |= signals.iter().any(|s| matches!(s, SloSignal::BudgetCritical { .. }));
        }
        assert!(saw_warning);
        assert!(saw_critical);
    }

    #[test]
    fn test_window_rollover_resets_budget() {
        let slo = Slo {
            window: TimeWindow::Minute,
            ..availability_slo()
        };
        let mut manager = SloManager::new();
        manager.add_slo(slo, ts(0));

        manager
            .evaluate(
                "api_availability",
                SliObservation::Ratio { good: 0, total: 100 },
                60,
                ts(30),
            )
            .unwrap();
        assert!(manager.status("api_availability").unwrap().budget.is_exhausted());

        // Past the window end the budget starts fresh
        manager
            .evaluate(
                "api_availability",
                SliObservation::Ratio { good: 100, total: 100 },
                60,
                ts(90),
            )
            .unwrap();
        let budget = manager.status("api_availability").unwrap().budget;
        assert!(!budget.is_exhausted());
        assert_eq!(budget.consumed_pct, 0.0);
    }

    #[test]
    fn test_latency_sli_degradation() {
        let slo = Slo {
            name: "checkout_latency".to_string(),
            sli: SliKind::Latency { threshold_ms: 200.0 },
            ..availability_slo()
        };
        let mut manager = SloManager::new();
        manager.add_slo(slo, ts(0));

        manager
            .evaluate(
                "checkout_latency",
                SliObservation::Latency { observed_ms: 150.0 },
                300,
                ts(300),
            )
            .unwrap();
        assert_eq!(manager.status("checkout_latency").unwrap().current_sli_pct, 100.0);

        manager
            .evaluate(
                "checkout_latency",
                SliObservation::Latency { observed_ms: 300.0 },
                300,
                ts(600),
            )
            .unwrap();
        let status = manager.status("checkout_latency").unwrap();
        assert_eq!(status.current_sli_pct, 50.0);
        assert!(!status.meeting_target);
    }

    #[test]
    fn test_observation_mismatch() {
        let mut manager = SloManager::new();
        manager.add_slo(availability_slo(), ts(0));

        let err = manager
            .evaluate(
                "api_availability",
                SliObservation::Latency { observed_ms: 10.0 },
                300,
                ts(300),
            )
            .unwrap_err();
        assert!(matches!(err, SloError::ObservationMismatch { .. }));

        let err = manager
            .evaluate("nope", SliObservation::Ratio { good: 1, total: 1 }, 300, ts(300))
            .unwrap_err();
        assert!(matches!(err, SloError::Unknown(_)));
    }
}
