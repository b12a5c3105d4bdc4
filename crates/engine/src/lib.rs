//! Alerting Core Engine
//!
//! Wires the metric history, threshold evaluation, alert registry,
//! correlation, routing, SLO tracking, and incident lifecycle into one
//! explicit owner struct with two periodic cycle drivers.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod config;
mod engine;
mod supervisor;

pub use config::{ConfigError, EngineConfig, EngineSettings};
pub use engine::{CycleReport, Engine, EngineError};
pub use supervisor::{SliSource, Supervisor};

/// Install the global tracing subscriber. Call once at startup.
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("tracing subscriber already installed");
    }
}
