use anyhow::{Context, Result};
use tracing::info;

use docman::config::Settings;
use docman::http::{self, AppState};
use docman::logging::{self, Severity};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    // Logging first: a missing or unwritable log directory aborts startup here
    let log_info = logging::setup_logging(&settings)?;

    match logging::cleanup_stale_process_logs(
        &log_info.log_dir,
        log_info.process_id,
        settings.log_retention_days,
    ) {
        Ok(count) if count > 0 => info!("Cleaned up {} stale process log files", count),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to clean up stale log files: {:#}", e),
    }

    let state = AppState::new(settings, logging::get_logger(Some("app.http")));
    let handle = match http::start(state).await {
        Ok(handle) => handle,
        Err(e) => {
            logging::get_logger(None).log(
                Severity::Critical,
                format!("Failed to initialize application: {:#}", e),
            );
            logging::registry().flush();
            return Err(e);
        }
    };
    info!("Application initialization complete");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    handle.shutdown().await?;
    logging::registry().flush();
    Ok(())
}
