use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};

use chargeback_core::config::ChargebackConfig;
use chargeback_core::domain::chargeback::dto::chargeback_run_request::ChargebackRunRequest;
use chargeback_core::domain::chargeback::service::chargeback_service::run_chargeback_report;
use chargeback_core::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ChargebackConfig::from_env()?;
    let _guard = init_tracing(&config.log_dir, &config.log_level)?;

    let request_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: chargeback <request.json>")?;

    let raw = std::fs::read_to_string(&request_path)
        .with_context(|| format!("Failed to read {}", request_path.display()))?;
    let req: ChargebackRunRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", request_path.display()))?;

    info!(
        data_dir = %config.data_dir.display(),
        interval = %req.interval,
        "🚀 Running chargeback report"
    );

    match run_chargeback_report(req, &config).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "Chargeback report failed");
            Err(err)
        }
    }
}
