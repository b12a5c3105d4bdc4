//! Per-Series Rolling Windows

use crate::stats::SeriesStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Default window capacity per series (last 1000 points)
pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

/// A single metric observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Observed value
    pub value: f64,
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
}

/// Bounded window of samples for one series
#[derive(Debug, Default)]
struct SeriesWindow {
    samples: VecDeque<MetricSample>,
}

impl SeriesWindow {
    fn push(&mut self, sample: MetricSample, capacity: usize) {
        if self.samples.len() >= capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }
}

/// Rolling history over all known series
pub struct MetricHistory {
    series: HashMap<String, SeriesWindow>,
    capacity: usize,
}

impl MetricHistory {
    /// Create a history with the given per-series capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            series: HashMap::new(),
            capacity,
        }
    }

    /// Create a history with the default capacity (1000 points per series)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }

    /// Record a sample, dropping the oldest point if the window is full
    pub fn record(&mut self, series: &str, value: f64, timestamp: DateTime<Utc>) {
        let window = self.series.entry(series.to_string()).or_default();
        window.push(MetricSample { value, timestamp }, self.capacity);
        debug!(series, value, "recorded sample");
    }

    /// Most recent sample for a series
    pub fn latest(&self, series: &str) -> Option<MetricSample> {
        self.series
            .get(series)
            .and_then(|w| w.samples.back())
            .copied()
    }

    /// Summary statistics, or `None` until enough samples exist
    pub fn stats(&self, series: &str) -> Option<SeriesStats> {
        let window = self.series.get(series)?;
        let values: Vec<f64> = window.samples.iter().map(|s| s.value).collect();
        SeriesStats::compute(&values)
    }

    /// Values observed at or after the cutoff, oldest first
    pub fn values_since(&self, series: &str, cutoff: DateTime<Utc>) -> Vec<f64> {
        self.series
            .get(series)
            .map(|w| {
                w.samples
                    .iter()
                    .filter(|s| s.timestamp >= cutoff)
                    .map(|s| s.value)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of samples currently held for a series
    pub fn len(&self, series: &str) -> usize {
        self.series.get(series).map_or(0, |w| w.samples.len())
    }

    /// Whether a series has no samples
    pub fn is_empty(&self, series: &str) -> bool {
        self.len(series) == 0
    }

    /// Names of all tracked series
    pub fn series_names(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }
}

impl Default for MetricHistory {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
