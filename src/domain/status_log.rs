use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde::Serialize;

use super::types::StatusKind;

const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct StatusLine {
    pub at: DateTime<Utc>,
    pub kind: LineKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Status(StatusKind),
    AlertDelivered,
    AlertFailed,
    Control,
}

impl StatusLine {
    pub fn render(&self, tz: Tz) -> String {
        let label = match self.kind {
            LineKind::Status(kind) => kind.to_string(),
            LineKind::AlertDelivered => "ALERT SENT".to_string(),
            LineKind::AlertFailed => "ALERT FAILED".to_string(),
            LineKind::Control => "CONTROL".to_string(),
        };
        format!(
            "[{}] {} {}",
            self.at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S"),
            label,
            self.message
        )
    }
}

/// Bounded history of status lines shared with whatever displays them.
#[derive(Debug)]
pub struct StatusLog {
    lines: Mutex<VecDeque<StatusLine>>,
    capacity: usize,
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl StatusLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, kind: LineKind, message: impl Into<String>) -> StatusLine {
        self.push_at(Utc::now(), kind, message)
    }

    /// Appends a line stamped with the moment the event happened rather than
    /// the moment it was recorded.
    pub fn push_at(
        &self,
        at: DateTime<Utc>,
        kind: LineKind,
        message: impl Into<String>,
    ) -> StatusLine {
        let line = StatusLine {
            at,
            kind,
            message: message.into(),
        };
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.clone());
        line
    }

    pub fn latest(&self) -> Option<StatusLine> {
        self.lines.lock().back().cloned()
    }

    /// Most recent check or alert line, skipping start/stop bookkeeping.
    pub fn latest_result(&self) -> Option<StatusLine> {
        self.lines
            .lock()
            .iter()
            .rev()
            .find(|line| line.kind != LineKind::Control)
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<StatusLine> {
        self.lines.lock().iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn count(&self, kind: LineKind) -> usize {
        self.lines.lock().iter().filter(|line| line.kind == kind).count()
    }
}
