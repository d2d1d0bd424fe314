use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono_tz::Tz;
use tokio::{sync::Mutex, time::timeout};

use crate::{
    config::{AppConfig, RunMode},
    domain::{LineKind, RunState, StatusLog},
    fetcher::PageFetcher,
    infrastructure::{directories::ResolvedPaths, shutdown::StopSignal},
    notify::build_channel,
    tasks::{
        monitor::{MonitorLoop, Tick},
        scheduler::configure_check_jobs,
    },
};

pub struct TicketWatchApp {
    _paths: ResolvedPaths,
    config: Arc<AppConfig>,
    monitor: MonitorLoop,
    stop: StopSignal,
    timezone: Tz,
}

impl TicketWatchApp {
    pub fn initialize(config: AppConfig, paths: ResolvedPaths, stop: StopSignal) -> Result<Self> {
        // Report missing fields before anything touches the network.
        config.monitor.validate()?;

        let timezone: Tz = config.timezone.parse().unwrap_or(chrono_tz::Asia::Kolkata);
        let channel = build_channel(&config.monitor)?;
        let fetcher = Arc::new(PageFetcher::new(config.monitor.fetch.clone())?);
        let monitor = MonitorLoop::new(
            Arc::new(config.monitor.clone()),
            fetcher,
            channel,
            Arc::new(StatusLog::default()),
        );

        Ok(Self {
            _paths: paths,
            config: Arc::new(config),
            monitor,
            stop,
            timezone,
        })
    }

    pub async fn run(self) -> Result<RunState> {
        let TicketWatchApp {
            _paths: _,
            config,
            mut monitor,
            stop,
            timezone,
        } = self;

        tracing::info!(event = %config.monitor.event_name, mode = ?config.run_mode, "ticket watch starting");
        monitor.start()?;
        let status_log = monitor.status_log().clone();

        let state = match config.run_mode {
            RunMode::Watch => monitor.run(&mut stop.listener()).await,
            RunMode::Once => run_once(&mut monitor).await,
            RunMode::Cron => run_scheduled(monitor, &config.cron_specs, &stop).await?,
        };

        let history = status_log.snapshot();
        let checks = history
            .iter()
            .filter(|line| matches!(line.kind, LineKind::Status(_)))
            .count();
        if let Some(line) = status_log.latest_result() {
            tracing::info!(
                target: "monitor",
                checks,
                last = %line.render(timezone),
                "final status"
            );
        }
        match state {
            RunState::Completed { alerted: true } => tracing::info!("alert sent, exiting"),
            other => tracing::info!(state = ?other, "ticket watch finished without an alert"),
        }
        Ok(state)
    }
}

/// Single check, then the run ends whatever the page said.
async fn run_once(monitor: &mut MonitorLoop) -> RunState {
    if let Tick::Checked(status) | Tick::AlertFailed { status, .. } = monitor.tick().await {
        tracing::info!(
            target: "monitor",
            status = %status.kind,
            "single check found no confirmed alert"
        );
    }
    monitor.stop()
}

async fn run_scheduled(
    monitor: MonitorLoop,
    cron_specs: &[String],
    stop: &StopSignal,
) -> Result<RunState> {
    let shutdown_timeout = Duration::from_secs(5);
    let done = StopSignal::new();
    let shared = Arc::new(Mutex::new(monitor));
    let mut scheduler = configure_check_jobs(cron_specs, shared.clone(), done.clone()).await?;

    let mut done_listener = done.listener();
    let mut stop_listener = stop.listener();
    tokio::select! {
        _ = done_listener.stopped() => {
            tracing::info!(target: "scheduler", "run finished");
        }
        _ = stop_listener.stopped() => {
            tracing::info!(target: "scheduler", "stop requested");
        }
    }

    match timeout(shutdown_timeout, scheduler.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::error!(target: "scheduler", ?err, "scheduler shutdown failed");
        }
        Err(_) => {
            tracing::warn!(
                target: "scheduler",
                "scheduler did not shut down within {:?}",
                shutdown_timeout
            );
        }
    }

    let mut monitor = shared.lock().await;
    Ok(monitor.stop())
}
