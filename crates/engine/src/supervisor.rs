//! Cycle Drivers
//!
//! Two periodic loops drive the engine: alert evaluation and SLO
//! evaluation. Each runs on its own tokio interval and stops on a shared
//! watch-channel shutdown signal. A failing cycle logs and waits for the
//! next tick; nothing here is fatal to the process.

use crate::engine::Engine;
use chrono::Utc;
use slo::SliObservation;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Supplies one cycle's worth of raw SLI observations, one entry per SLO
/// to evaluate. Implementations typically read request counters or latency
/// percentiles from the serving stack.
pub trait SliSource: Send + Sync + 'static {
    fn observe(&self) -> Vec<(String, SliObservation)>;
}

/// Handle over the running cycle loops
pub struct Supervisor {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Supervisor {
    /// Spawn both cycle loops for an engine. Intervals come from the
    /// engine's settings.
    pub fn spawn(engine: Arc<Engine>, sli_source: Arc<dyn SliSource>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let alert_interval = Duration::from_secs(engine.settings().alert_interval_secs);
        let slo_interval = Duration::from_secs(engine.settings().slo_interval_secs);

        let handles = vec![
            spawn_alert_loop(engine.clone(), alert_interval, shutdown.subscribe()),
            spawn_slo_loop(engine, sli_source, slo_interval, shutdown.subscribe()),
        ];

        info!(
            alert_interval_secs = alert_interval.as_secs(),
            slo_interval_secs = slo_interval.as_secs(),
            "cycle drivers started"
        );
        Self { shutdown, handles }
    }

    /// Signal both loops to stop and wait for them to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("cycle drivers stopped");
    }
}

fn spawn_alert_loop(
    engine: Arc<Engine>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match engine.run_evaluation_cycle(Utc::now()) {
                        Ok(report) => debug!(
                            events = report.events.len(),
                            groups = report.groups.len(),
                            "alert cycle complete"
                        ),
                        Err(e) => warn!(error = %e, "alert cycle failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_slo_loop(
    engine: Arc<Engine>,
    sli_source: Arc<dyn SliSource>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let observations = sli_source.observe();
                    match engine.run_slo_cycle(&observations, Utc::now()) {
                        Ok(signals) => debug!(signals = signals.len(), "SLO cycle complete"),
                        Err(e) => warn!(error = %e, "SLO cycle failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use alerting::{AlertRule, Severity};
    use incident::ContactDirectory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl SliSource for CountingSource {
        fn observe(&self) -> Vec<(String, SliObservation)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    fn engine() -> Arc<Engine> {
        let config = EngineConfig {
            rules: vec![AlertRule::new("r", "series", Severity::Low, 1.0)],
            ..Default::default()
        };
        Arc::new(Engine::new(config, Vec::new(), ContactDirectory::new(), Utc::now()).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_slo_loop_ticks_on_interval() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
        let supervisor = Supervisor::spawn(engine(), source.clone());

        // First tick is immediate, then one per interval (default 300s)
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(source.calls.load(Ordering::SeqCst) >= 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(source.calls.load(Ordering::SeqCst) >= 2);
        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loops() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
        let supervisor = Supervisor::spawn(engine(), source.clone());
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        supervisor.shutdown().await;

        let before = source.calls.load(Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(3600)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), before);
    }
}
