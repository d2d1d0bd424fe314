use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw outcome of one fetch, discarded once it has been classified.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub outcome: FetchOutcome,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Response { status: u16, body: String },
    TransportError(String),
}

impl FetchResult {
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        Self {
            outcome: FetchOutcome::Response {
                status,
                body: body.into(),
            },
            fetched_at: Utc::now(),
        }
    }

    pub fn transport_error(cause: impl Into<String>) -> Self {
        Self {
            outcome: FetchOutcome::TransportError(cause.into()),
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Available,
    Waiting,
    Blocked,
    TransportError,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusKind::Available => "AVAILABLE",
            StatusKind::Waiting => "WAITING",
            StatusKind::Blocked => "BLOCKED",
            StatusKind::TransportError => "ERROR",
        };
        f.write_str(label)
    }
}

/// Verdict for a single tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.kind == StatusKind::Available
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopped,
    Completed { alerted: bool },
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}
