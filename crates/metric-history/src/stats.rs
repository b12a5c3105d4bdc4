//! Series Statistics Computation

use serde::{Deserialize, Serialize};

/// Minimum sample count before statistics are considered meaningful
pub const MIN_SAMPLES_FOR_STATS: usize = 10;

/// Summary statistics for one series window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Number of samples
    pub count: usize,
    /// Mean value
    pub mean: f64,
    /// Standard deviation (population)
    pub std_dev: f64,
    /// Median value
    pub median: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

impl SeriesStats {
    /// Compute statistics from raw values.
    /// Returns `None` below the minimum sample count.
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.len() < MIN_SAMPLES_FOR_STATS {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let variance = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Some(Self {
            count: values.len(),
            mean,
            std_dev,
            median: percentile_sorted(&sorted, 50.0),
            p95: percentile_sorted(&sorted, 95.0),
            p99: percentile_sorted(&sorted, 99.0),
        })
    }
}

/// Nearest-rank percentile over an already-sorted slice
fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data() {
        let values: Vec<f64> = (0..9).map(|i| i as f64).collect();
        assert!(SeriesStats::compute(&values).is_none());
    }

    #[test]
    fn test_basic_stats() {
        let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let stats = SeriesStats::compute(&values).unwrap();

        assert_eq!(stats.count, 10);
        assert!((stats.mean - 5.5).abs() < 1e-9);
        assert_eq!(stats.median, 5.0);
        assert_eq!(stats.p95, 10.0);
    }

    #[test]
    fn test_percentiles_on_larger_window() {
        let values: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let stats = SeriesStats::compute(&values).unwrap();

        assert_eq!(stats.median, 50.0);
        assert_eq!(stats.p95, 95.0);
        assert_eq!(stats.p99, 99.0);
    }

    #[test]
    fn test_zero_variance() {
        let values = vec![7.0; 20];
        let stats = SeriesStats::compute(&values).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean, 7.0);
    }
}
