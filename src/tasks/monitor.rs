use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

use crate::{
    classifier::PageClassifier,
    config::{ConfigError, MonitorConfig},
    domain::{LineKind, NotificationOutcome, RunState, Status, StatusKind, StatusLog},
    fetcher::PageSource,
    infrastructure::shutdown::StopListener,
    notify::{compose_alert, NotificationChannel},
};

/// Pause added on top of the poll interval after a failed alert, so a
/// flaky provider is not hit again right away.
pub const ALERT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("monitor is already running")]
    AlreadyRunning,
}

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The run is not `Running`; nothing was fetched.
    Skipped,
    Checked(Status),
    AlertFailed { status: Status, reason: String },
    Alerted(Status),
}

/// Fetch → classify → notify state machine for one watched page.
pub struct MonitorLoop {
    config: Arc<MonitorConfig>,
    source: Arc<dyn PageSource>,
    classifier: PageClassifier,
    channel: Arc<dyn NotificationChannel>,
    status_log: Arc<StatusLog>,
    state: RunState,
    target: Option<Url>,
    ticks: usize,
}

impl MonitorLoop {
    pub fn new(
        config: Arc<MonitorConfig>,
        source: Arc<dyn PageSource>,
        channel: Arc<dyn NotificationChannel>,
        status_log: Arc<StatusLog>,
    ) -> Self {
        let classifier = PageClassifier::new(config.classifier.clone());
        Self {
            config,
            source,
            classifier,
            channel,
            status_log,
            state: RunState::Idle,
            target: None,
            ticks: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn status_log(&self) -> &Arc<StatusLog> {
        &self.status_log
    }

    /// Begins a fresh run. Validation happens here, before any network call.
    pub fn start(&mut self) -> Result<(), StartError> {
        if self.state.is_running() {
            return Err(StartError::AlreadyRunning);
        }

        let url = match self.config.validate() {
            Ok(url) => url,
            Err(err) => {
                self.state = RunState::Idle;
                self.target = None;
                tracing::error!(target: "monitor", error = %err, "cannot start monitoring");
                self.status_log
                    .push(LineKind::Control, format!("cannot start: {err}"));
                return Err(err.into());
            }
        };

        tracing::info!(
            target: "monitor",
            url = %url,
            interval_secs = self.config.poll_interval.as_secs(),
            channel = self.channel.name(),
            "monitoring started"
        );
        self.status_log.push(
            LineKind::Control,
            format!(
                "monitoring {} every {}s, alerts via {}",
                url,
                self.config.poll_interval.as_secs(),
                self.channel.name()
            ),
        );
        self.target = Some(url);
        self.ticks = 0;
        self.state = RunState::Running;
        Ok(())
    }

    pub fn stop(&mut self) -> RunState {
        if self.state.is_running() {
            self.state = RunState::Stopped;
            tracing::info!(target: "monitor", ticks = self.ticks, "monitoring stopped");
            self.status_log.push(LineKind::Control, "monitoring stopped");
        }
        self.state
    }

    /// Runs one fetch-classify(-notify) cycle if the run is active.
    pub async fn tick(&mut self) -> Tick {
        if !self.state.is_running() {
            return Tick::Skipped;
        }
        let Some(url) = self.target.clone() else {
            return Tick::Skipped;
        };

        let fetched = self.source.fetch(&url, self.ticks).await;
        self.ticks += 1;
        let status = self.classifier.classify(&fetched);
        self.record(&status, fetched.fetched_at);

        if !status.is_available() {
            return Tick::Checked(status);
        }

        let message = compose_alert(&self.config.event_name, url.as_str(), &status.message);
        match self.channel.send(&message).await {
            NotificationOutcome::Delivered => {
                self.state = RunState::Completed { alerted: true };
                tracing::info!(
                    target: "monitor",
                    channel = self.channel.name(),
                    "alert delivered, monitoring complete"
                );
                self.status_log.push(
                    LineKind::AlertDelivered,
                    format!("alert delivered via {}", self.channel.name()),
                );
                Tick::Alerted(status)
            }
            NotificationOutcome::Failed(reason) => {
                tracing::error!(
                    target: "monitor",
                    channel = self.channel.name(),
                    reason = %reason,
                    "alert failed, will keep polling"
                );
                self.status_log
                    .push(LineKind::AlertFailed, format!("alert failed: {reason}"));
                Tick::AlertFailed { status, reason }
            }
        }
    }

    /// Polls until an alert is delivered or a stop is requested.
    pub async fn run(&mut self, stop: &mut StopListener) -> RunState {
        loop {
            if stop.is_stopped() {
                self.stop();
                break;
            }

            let pause = match self.tick().await {
                Tick::Skipped | Tick::Alerted(_) => break,
                Tick::Checked(_) => self.config.poll_interval,
                Tick::AlertFailed { .. } => ALERT_RETRY_BACKOFF + self.config.poll_interval,
            };

            tokio::select! {
                _ = sleep(pause) => {}
                _ = stop.stopped() => {}
            }
        }
        self.state
    }

    fn record(&self, status: &Status, fetched_at: DateTime<Utc>) {
        let tick = self.ticks;
        match status.kind {
            StatusKind::Available => {
                tracing::info!(target: "monitor", tick, message = %status.message, "tickets detected")
            }
            StatusKind::Waiting => {
                tracing::info!(target: "monitor", tick, message = %status.message, "still waiting")
            }
            StatusKind::Blocked => {
                tracing::warn!(target: "monitor", tick, message = %status.message, "request looks blocked")
            }
            StatusKind::TransportError => {
                tracing::error!(target: "monitor", tick, message = %status.message, "check failed")
            }
        }
        self.status_log.push_at(
            fetched_at,
            LineKind::Status(status.kind),
            status.message.clone(),
        );
    }
}
