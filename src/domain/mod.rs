pub mod status_log;
pub mod types;

pub use status_log::{LineKind, StatusLog};
pub use types::{FetchOutcome, FetchResult, NotificationOutcome, RunState, Status, StatusKind};
