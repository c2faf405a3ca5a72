use std::time::Duration;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::app::jobs::JobService;

const ERROR_BACKOFF_MS: u64 = 1000;

/// Deletes expired job postings every `interval` until the task is dropped.
pub async fn run(jobs: JobService, interval: Duration) {
    info!(interval_seconds = interval.as_secs(), "job expiry sweeper started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = sweep(&jobs, OffsetDateTime::now_utc()).await {
            warn!(error = ?err, "job expiry sweep failed, backing off");
            tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
        }
    }
}

pub async fn sweep(jobs: &JobService, now: OffsetDateTime) -> anyhow::Result<u64> {
    jobs.purge_expired(now).await
}
