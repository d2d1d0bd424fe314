//! Scripted page sources and recording channels shared by the loop, cron and
//! run-mode tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::{
    config::{ChannelConfig, ClassifierConfig, FetchConfig, MonitorConfig},
    domain::{FetchResult, NotificationOutcome, StatusLog},
    fetcher::PageSource,
    infrastructure::shutdown::StopSignal,
    notify::NotificationChannel,
    tasks::monitor::MonitorLoop,
};

pub const INTERVAL: Duration = Duration::from_secs(60);

pub fn page(text: &str) -> FetchResult {
    let mut body = format!("<html><body><h1>{text}</h1><p>");
    while body.len() < 1500 {
        body.push_str("Match details, venue information and terms. ");
    }
    body.push_str("</p></body></html>");
    FetchResult::response(200, body)
}

pub fn waiting() -> FetchResult {
    page("Coming Soon")
}

pub fn available() -> FetchResult {
    page("Book Now")
}

pub fn blocked() -> FetchResult {
    FetchResult::response(403, "Access Denied")
}

/// Replays scripted pages, repeating the last one, and can request a
/// stop once a given number of fetches has happened.
pub struct ScriptedSource {
    pages: Mutex<VecDeque<FetchResult>>,
    last: Mutex<FetchResult>,
    calls: AtomicUsize,
    stop_after: Option<(usize, StopSignal)>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<FetchResult>) -> Self {
        Self {
            last: Mutex::new(pages.last().cloned().unwrap_or_else(waiting)),
            pages: Mutex::new(pages.into()),
            calls: AtomicUsize::new(0),
            stop_after: None,
        }
    }

    pub fn stopping_after(mut self, fetches: usize, signal: StopSignal) -> Self {
        self.stop_after = Some((fetches, signal));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, _url: &Url, _identity_hint: usize) -> FetchResult {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, signal)) = &self.stop_after {
            if n >= *after {
                signal.stop();
            }
        }
        let next = self.pages.lock().pop_front();
        match next {
            Some(page) => page,
            None => self.last.lock().clone(),
        }
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    outcomes: Mutex<VecDeque<NotificationOutcome>>,
    sent: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn failing_first(times: usize) -> Self {
        let channel = Self::default();
        for _ in 0..times {
            channel
                .outcomes
                .lock()
                .push_back(NotificationOutcome::Failed("smtp unreachable".to_string()));
        }
        channel
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &str) -> NotificationOutcome {
        self.sent.lock().push(message.to_string());
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or(NotificationOutcome::Delivered)
    }
}

pub fn config() -> MonitorConfig {
    MonitorConfig {
        target_url: "https://tickets.example.com/event/42".to_string(),
        event_name: "India vs Namibia".to_string(),
        poll_interval: INTERVAL,
        channel: ChannelConfig::NoOp,
        classifier: ClassifierConfig::default(),
        fetch: FetchConfig::default(),
        notify_timeout: Duration::from_secs(5),
    }
}

pub fn monitor(
    config: MonitorConfig,
    source: &Arc<ScriptedSource>,
    channel: &Arc<RecordingChannel>,
) -> MonitorLoop {
    MonitorLoop::new(
        Arc::new(config),
        source.clone(),
        channel.clone(),
        Arc::new(StatusLog::default()),
    )
}
