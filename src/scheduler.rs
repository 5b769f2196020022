// src/scheduler.rs
use crate::digest::{DigestService, RunMode};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
}

impl SchedulerCfg {
    pub fn from_hours(hours: u64) -> Self {
        Self {
            interval: Duration::from_secs(hours.max(1) * 3600),
        }
    }
}

/// Run the digest immediately, then once per interval. A failed run is
/// logged and the loop keeps going.
pub fn spawn_digest_scheduler(cfg: SchedulerCfg, service: Arc<DigestService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now();
            counter!("scheduler_ticks_total").increment(1);

            match service.run_once(RunMode::Deliver, now).await {
                Ok(report) => tracing::info!(
                    target: "digest",
                    selected = report.selection.selected,
                    next_in_secs = cfg.interval.as_secs(),
                    "scheduled digest tick"
                ),
                Err(e) => {
                    counter!("scheduler_failures_total").increment(1);
                    tracing::error!(target: "digest", error = %format!("{e:#}"), "scheduled digest failed");
                }
            }
        }
    })
}
