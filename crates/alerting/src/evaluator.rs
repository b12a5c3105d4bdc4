//! Threshold Evaluation Strategies

use crate::rule::{AlertRule, ThresholdKind};
use chrono::{DateTime, Duration, Utc};
use metric_history::MetricHistory;
use tracing::debug;

/// Decide whether the rule's condition holds for the current value.
///
/// The three stats-based strategies treat missing history as not-exceeded;
/// a rule never fires off a window it cannot measure.
pub fn is_exceeded(rule: &AlertRule, value: f64, history: &MetricHistory, now: DateTime<Utc>) -> bool {
    match rule.kind {
        ThresholdKind::Static => value > rule.threshold,

        ThresholdKind::DynamicPercentile => match history.stats(&rule.series) {
            Some(stats) => value > stats.p95 * (1.0 + rule.threshold / 100.0),
            None => false,
        },

        ThresholdKind::PercentageChange => {
            let cutoff = now - Duration::minutes(rule.window_minutes as i64);
            let window = history.values_since(&rule.series, cutoff);
            if window.is_empty() {
                return false;
            }
            let baseline = window.iter().sum::<f64>() / window.len() as f64;
            if baseline == 0.0 {
                debug!(rule = %rule.name, "zero baseline, percentage change undefined");
                return false;
            }
            (value - baseline).abs() / baseline * 100.0 > rule.threshold
        }

        ThresholdKind::AnomalyZscore => match history.stats(&rule.series) {
            Some(stats) if stats.std_dev > 0.0 => {
                (value - stats.mean).abs() / stats.std_dev > rule.sensitivity
            }
            _ => false,
        },
    }
}

/// The currently effective numeric threshold for display and alert records.
///
/// Returns `None` when a stats-based strategy has no usable history yet.
pub fn dynamic_threshold(rule: &AlertRule, history: &MetricHistory, now: DateTime<Utc>) -> Option<f64> {
    match rule.kind {
        ThresholdKind::Static => Some(rule.threshold),

        ThresholdKind::DynamicPercentile => history
            .stats(&rule.series)
            .map(|s| s.p95 * (1.0 + rule.threshold / 100.0)),

        ThresholdKind::PercentageChange => {
            let cutoff = now - Duration::minutes(rule.window_minutes as i64);
            let window = history.values_since(&rule.series, cutoff);
            if window.is_empty() {
                return None;
            }
            let baseline = window.iter().sum::<f64>() / window.len() as f64;
            // Upper bound of the allowed band around the baseline
            Some(baseline * (1.0 + rule.threshold / 100.0))
        }

        ThresholdKind::AnomalyZscore => history
            .stats(&rule.series)
            .map(|s| s.mean + rule.sensitivity * s.std_dev),
    }
}
