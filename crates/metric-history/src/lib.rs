//! Metric History Tracker
//!
//! Maintains a bounded rolling window of recent samples per metric series
//! and computes summary statistics on demand.

mod stats;
mod window;

pub use stats::{SeriesStats, MIN_SAMPLES_FOR_STATS};
pub use window::{MetricHistory, MetricSample, DEFAULT_WINDOW_CAPACITY};
