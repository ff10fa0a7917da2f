pub mod config;
pub mod imaging;
pub mod local;
pub mod logging;
pub mod storage;
pub mod viewer;

use crate::config::Config;
use crate::local::{LocalError, LocalReport};

/// Run the viewer once against the configured local data directory
pub async fn run(config: Config) -> Result<LocalReport, LocalError> {
    tracing::info!("🔧 Starting '{}'", config.app.id);

    let report = local::run(&config).await?;

    tracing::info!(
        "Finished in state {} after offering {} object(s); {} produced",
        report.final_state,
        report.offered,
        report.results.len()
    );
    Ok(report)
}
