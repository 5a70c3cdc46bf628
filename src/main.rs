//! PDF translator TUI: entry point and runtime setup.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

mod api;
mod app;
mod config;
mod events;
mod input;
mod jobs;
mod layout;
mod orchestrator;
mod progress;
mod shortcuts;
mod ui;
mod worker;

/// Log to a file; stdout belongs to the TUI.
fn init_logging() -> Result<WorkerGuard> {
    let log_file = "pdf_translator.log";
    let file_appender = tracing_appender::rolling::never(".", log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {log_file}");
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so buffered lines get flushed.
    let _log_guard = init_logging()?;
    tracing::info!("app starting");

    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal).await;
    ui::restore_terminal()?;

    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("app exiting");
    res
}
