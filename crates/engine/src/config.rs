//! Engine Configuration
//!
//! Layered configuration: an optional file source overlaid with
//! `ALERTCORE_`-prefixed environment variables. Everything is validated
//! fail-fast at load time; nothing about the configuration can fail later
//! during an evaluation cycle.

use alerting::AlertRule;
use config::{Config, Environment, File};
use correlation::CorrelationRule;
use routing::{BusinessHours, RoutingRule};
use serde::{Deserialize, Serialize};
use slo::Slo;
use std::collections::HashSet;
use thiserror::Error;

/// Configuration loading and validation errors, fatal to startup only
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file or environment sources could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A validation rule failed
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Cycle timing and engine behavior knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Alert evaluation cycle interval in seconds
    #[serde(default = "default_alert_interval")]
    pub alert_interval_secs: u64,
    /// SLO evaluation cycle interval in seconds
    #[serde(default = "default_slo_interval")]
    pub slo_interval_secs: u64,
    /// Open an incident when a correlated group reaches critical severity
    #[serde(default = "default_true")]
    pub incident_on_critical_group: bool,
}

fn default_alert_interval() -> u64 {
    30
}

fn default_slo_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            alert_interval_secs: default_alert_interval(),
            slo_interval_secs: default_slo_interval(),
            incident_on_critical_group: default_true(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    /// Alert rules, evaluated every alert cycle
    #[serde(default)]
    pub rules: Vec<AlertRule>,
    /// Correlation rules, consulted in declaration order
    #[serde(default)]
    pub correlations: Vec<CorrelationRule>,
    /// Routing rules, consulted in declaration order
    #[serde(default)]
    pub routes: Vec<RoutingRule>,
    /// SLO definitions
    #[serde(default)]
    pub slos: Vec<Slo>,
    #[serde(default)]
    pub business_hours: BusinessHours,
}

impl EngineConfig {
    /// Load from an optional file plus the `ALERTCORE_` environment overlay
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(Environment::with_prefix("ALERTCORE").separator("__"));

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would otherwise fail at evaluation time
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.alert_interval_secs == 0 {
            return Err(ConfigError::Invalid("alert_interval_secs must be > 0".into()));
        }
        if self.engine.slo_interval_secs == 0 {
            return Err(ConfigError::Invalid("slo_interval_secs must be > 0".into()));
        }

        let mut names = HashSet::new();
        for rule in &self.rules {
            if rule.name.is_empty() {
                return Err(ConfigError::Invalid("alert rule with empty name".into()));
            }
            if !names.insert(rule.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate alert rule name: {}",
                    rule.name
                )));
            }
            if rule.series.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "rule {}: empty metric series",
                    rule.name
                )));
            }
            if rule.window_minutes == 0 {
                return Err(ConfigError::Invalid(format!(
                    "rule {}: window_minutes must be > 0",
                    rule.name
                )));
            }
            if rule.eval_interval_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "rule {}: eval_interval_secs must be > 0",
                    rule.name
                )));
            }
            if !rule.threshold.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "rule {}: threshold must be finite",
                    rule.name
                )));
            }
        }

        for route in &self.routes {
            if route.channels.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "route {}: no channels",
                    route.name
                )));
            }
        }

        let mut slo_names = HashSet::new();
        for slo in &self.slos {
            if slo.name.is_empty() {
                return Err(ConfigError::Invalid("SLO with empty name".into()));
            }
            if !slo_names.insert(slo.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate SLO name: {}",
                    slo.name
                )));
            }
            if slo.target_pct <= 0.0 || slo.target_pct >= 100.0 {
                return Err(ConfigError::Invalid(format!(
                    "SLO {}: target_pct must be within (0, 100)",
                    slo.name
                )));
            }
            if slo.burn_rate_alert_threshold < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "SLO {}: negative burn rate threshold",
                    slo.name
                )));
            }
        }

        for correlation in &self.correlations {
            if correlation.time_window_minutes == 0 {
                return Err(ConfigError::Invalid(format!(
                    "correlation {}: time_window_minutes must be > 0",
                    correlation.name
                )));
            }
            if correlation.min_alerts == 0 {
                return Err(ConfigError::Invalid(format!(
                    "correlation {}: min_alerts must be > 0",
                    correlation.name
                )));
            }
        }

        Ok(())
    }
}
