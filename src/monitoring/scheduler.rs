//! Periodic driver for the check pipeline.
//!
//! Every tick is its own task, so an overrunning tick never delays the next
//! one. Within a tick each due endpoint gets its own unit task; all units,
//! across all ticks, share one semaphore that caps how many checks run at
//! once. A unit claims its endpoint lease only once it holds a permit.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::db::entities::endpoint;
use crate::db::services::endpoint_service;
use crate::monitoring::error::MonitorError;
use crate::monitoring::runner::{CheckReport, CheckRunner};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub max_concurrent_checks: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            max_concurrent_checks: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub checked: usize,
    /// Units that found the lease held or the endpoint no longer due.
    pub skipped: usize,
    pub failed: usize,
}

type UnitResult = Result<Option<CheckReport>, MonitorError>;

pub struct Scheduler {
    runner: CheckRunner,
    config: SchedulerConfig,
    permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(runner: CheckRunner, config: SchedulerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_checks.max(1)));
        Self {
            runner,
            config,
            permits,
        }
    }

    /// Ticks until the shutdown channel fires or its sender is dropped.
    /// In-flight ticks are aborted; their leases simply expire.
    pub async fn start(self: Arc<Self>, mut shutdown_rx: watch::Receiver<()>) {
        info!(
            tick_interval_secs = self.config.tick_interval.as_secs_f64(),
            max_concurrent_checks = self.config.max_concurrent_checks,
            "Check scheduler started."
        );

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: JoinSet<Result<TickSummary, MonitorError>> = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("Check scheduler shutting down.");
                    break;
                }
                _ = ticker.tick() => {
                    let scheduler = Arc::clone(&self);
                    ticks.spawn(async move { scheduler.run_tick(Utc::now()).await });
                }
                Some(joined) = ticks.join_next(), if !ticks.is_empty() => {
                    match joined {
                        Ok(Ok(summary)) => debug!(?summary, "Tick finished."),
                        Ok(Err(e)) => error!(error = %e, "Tick failed."),
                        Err(e) => error!(error = %e, "Tick task did not complete."),
                    }
                }
            }
        }

        self.permits.close();
        ticks.abort_all();
        while ticks.join_next().await.is_some() {}
    }

    /// Selects the endpoints due at `now` and runs one unit per endpoint,
    /// waiting for all of them. A failing unit never affects its siblings.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickSummary, MonitorError> {
        let due = endpoint_service::find_due_endpoints(self.runner.db(), now).await?;
        if due.is_empty() {
            return Ok(TickSummary::default());
        }

        let summary = run_units(due, |endpoint| {
            run_unit(self.runner.clone(), Arc::clone(&self.permits), endpoint)
        })
        .await;

        if summary.failed > 0 {
            warn!(?summary, "Tick completed with failures.");
        } else {
            info!(?summary, "Tick completed.");
        }
        Ok(summary)
    }
}

/// Spawns `unit` once per endpoint and tallies the results. Errors and
/// panics are counted as failures and never escape.
async fn run_units<F, Fut>(due: Vec<endpoint::Model>, unit: F) -> TickSummary
where
    F: Fn(endpoint::Model) -> Fut,
    Fut: Future<Output = UnitResult> + Send + 'static,
{
    let mut summary = TickSummary {
        due: due.len(),
        ..Default::default()
    };

    let mut units = JoinSet::new();
    for endpoint in due {
        let endpoint_id = endpoint.id;
        let work = unit(endpoint);
        units.spawn(async move { (endpoint_id, AssertUnwindSafe(work).catch_unwind().await) });
    }

    while let Some(joined) = units.join_next().await {
        match joined {
            Ok((_, Ok(Ok(Some(_))))) => summary.checked += 1,
            Ok((_, Ok(Ok(None)))) => summary.skipped += 1,
            Ok((endpoint_id, Ok(Err(e)))) => {
                summary.failed += 1;
                error!(endpoint_id, error = %e, "Check unit failed.");
            }
            Ok((endpoint_id, Err(_panic))) => {
                summary.failed += 1;
                error!(endpoint_id, "Check unit panicked.");
            }
            Err(e) => {
                summary.failed += 1;
                error!(error = %e, "Check unit task did not complete.");
            }
        }
    }
    summary
}

async fn run_unit(runner: CheckRunner, permits: Arc<Semaphore>, endpoint: endpoint::Model) -> UnitResult {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| MonitorError::SchedulerClosed)?;
    runner.claim_and_run(&endpoint).await
}
