use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use validator::Validate;

use crate::config::{parse_timezone, ChargebackConfig, ReportTimezone};
use crate::core::persistence::info::classification::classification_fs_adapter::ClassificationFsAdapter;
use crate::core::persistence::info::classification::classification_repository::ClassificationRepository;
use crate::core::persistence::info::rates::chargeback_rate_repository::ChargebackRateRepository;
use crate::core::persistence::metrics::rollup::metric_rollup_repository::MetricRollupRepository;
use crate::domain::chargeback::dto::chargeback_run_request::ChargebackRunRequest;
use crate::domain::chargeback::model::{ChargebackRunOptions, ReportSchema};
use crate::errors::ChargebackError;

use super::{build_results_concurrent, ChargebackRepositories};

/// Runs a report against the configured data directory.
pub async fn run_chargeback_report(req: ChargebackRunRequest, config: &ChargebackConfig) -> Result<Value> {
    let repos = ChargebackRepositories {
        rollups: Arc::new(MetricRollupRepository::new(&config.data_dir)?),
        rates: Arc::new(ChargebackRateRepository::new(&config.data_dir)?),
        classifications: Arc::new(ClassificationRepository::new(ClassificationFsAdapter::new(
            &config.data_dir,
        ))),
    };
    run_chargeback_report_with_repos(req, config, &repos, Utc::now()).await
}

pub async fn run_chargeback_report_with_repos(
    req: ChargebackRunRequest,
    config: &ChargebackConfig,
    repos: &ChargebackRepositories,
    now: DateTime<Utc>,
) -> Result<Value> {
    req.validate()
        .map_err(|e| ChargebackError::Validation(e.to_string()))?;

    let timezone = match &req.timezone {
        Some(raw) => parse_timezone(raw)?,
        None => config.timezone,
    };

    match timezone {
        ReportTimezone::Fixed(offset) => run_in(&req, config, repos, offset, timezone, now).await,
        ReportTimezone::Named(tz) => run_in(&req, config, repos, tz, timezone, now).await,
    }
}

async fn run_in<Tz: TimeZone>(
    req: &ChargebackRunRequest,
    config: &ChargebackConfig,
    repos: &ChargebackRepositories,
    tz: Tz,
    timezone: ReportTimezone,
    now: DateTime<Utc>,
) -> Result<Value> {
    let options = build_options(req, config, repos, tz)?;
    let records = build_results_concurrent(&options, repos, now).await?;

    Ok(serde_json::json!({
        "interval": options.interval,
        "timezone": timezone.to_string(),
        "total_rows": records.len(),
        "records": records,
    }))
}

fn build_options<Tz: TimeZone>(
    req: &ChargebackRunRequest,
    config: &ChargebackConfig,
    repos: &ChargebackRepositories,
    timezone: Tz,
) -> Result<ChargebackRunOptions<Tz>> {
    let interval = req.interval()?;
    let grouping = req.grouping()?;

    let schema = match &req.columns {
        Some(columns) => ReportSchema::new(columns.iter().cloned()),
        None => ReportSchema::for_rates(&repos.rates.default_rates()?),
    };

    Ok(ChargebackRunOptions {
        range: req.range_options(),
        interval,
        timezone,
        grouping,
        filters: req.filters.clone(),
        schema,
        enterprise: config.enterprise.clone(),
        fetch_concurrency: config.fetch_concurrency,
    })
}
