mod app;
mod classifier;
mod config;
mod domain;
mod fetcher;
mod infrastructure;
mod notify;
mod tasks;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    // Every line of the run carries the mode and the event being watched.
    let span = tracing::info_span!(
        "watch",
        mode = ?config.run_mode,
        event = %config.monitor.event_name
    );

    let stop = shutdown::StopSignal::new();
    shutdown::install_signal_handlers(stop.clone());

    let app = match app::TicketWatchApp::initialize(config, paths, stop) {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = %err, "cannot start ticket watch");
            return Err(err);
        }
    };
    app.run().instrument(span).await?;
    Ok(())
}
