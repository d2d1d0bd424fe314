use std::io;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

static INIT: OnceCell<()> = OnceCell::new();
static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Event targets the monitor logs under.
pub const MONITOR_TARGETS: &[&str] = &["monitor", "fetch", "notify", "scheduler"];

/// `LOG_LEVEL` applies to the monitor's own targets; HTTP, bot and scheduler
/// internals stay at `warn` unless `RUST_LOG` says otherwise.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string(), format!("ticket_watch={level}")];
    directives.extend(MONITOR_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}

/// Console plus a daily-rolled `monitor.log`; `RUST_LOG` overrides `LOG_LEVEL`.
pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(filter_directives(&config.logging.level)))
            .unwrap_or_else(|_| EnvFilter::new(filter_directives("info")));

        let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, "monitor.log");
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        let _ = GUARD.set(guard);

        // Status lines are read live; keep the console short.
        let console_layer = fmt::layer()
            .compact()
            .with_writer(io::stdout)
            .with_target(true)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_names(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::info!(
            target: "monitor",
            logs = %paths.logs_dir.display(),
            mode = ?config.run_mode,
            level = %config.logging.level,
            "tracing initialized"
        );
        Ok(())
    })?;
    Ok(())
}
