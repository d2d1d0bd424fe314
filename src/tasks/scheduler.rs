use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
    domain::RunState,
    infrastructure::shutdown::StopSignal,
    tasks::monitor::{MonitorLoop, Tick},
};

/// Registers one job per cron spec; every firing runs a single tick on the
/// shared run. Once the run leaves `Running`, `done` is signalled.
pub async fn configure_check_jobs(
    cron_specs: &[String],
    monitor: Arc<Mutex<MonitorLoop>>,
    done: StopSignal,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    for spec in cron_specs {
        let label = spec.clone();
        let monitor = monitor.clone();
        let done = done.clone();
        let job = Job::new_async(spec.as_str(), move |_id, _l| {
            let monitor = monitor.clone();
            let done = done.clone();
            let cron_label = label.clone();
            Box::pin(async move {
                // Overlapping firings are dropped; cycles never run concurrently.
                let Ok(mut monitor) = monitor.try_lock() else {
                    tracing::debug!(target: "scheduler", cron = %cron_label, "previous check still running");
                    return;
                };
                tracing::debug!(target: "scheduler", cron = %cron_label, "check triggered");
                if let Tick::Skipped = monitor.tick().await {
                    tracing::debug!(target: "scheduler", "run is no longer active");
                }
                if !matches!(monitor.state(), RunState::Running) {
                    done.stop();
                }
            })
        })?;
        scheduler.add(job).await?;
        tracing::info!(target: "scheduler", cron = %spec, "check job registered");
    }
    scheduler.start().await?;
    Ok(scheduler)
}
