//! Chargeback aggregation: partition the range, price every hourly sample,
//! fold the results per group and period.

pub mod chargeback_service;
pub mod cost_calculator;
pub mod grouping;
pub mod rate_resolver;
pub mod run_context;
pub mod time_range;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::core::persistence::info::classification::classification_api_repository_trait::ClassificationApiRepository;
use crate::core::persistence::info::rates::chargeback_rate_api_repository_trait::ChargebackRateApiRepository;
use crate::core::persistence::metrics::rollup::metric_rollup_api_repository_trait::{
    MetricRollupApiRepository, RollupQuery,
};
use crate::core::persistence::metrics::rollup::metric_rollup_entity::{
    CaptureInterval, MetricRollupEntity, RollupColumn,
};
use crate::domain::chargeback::model::{
    AggregateRow, ChargebackRecord, ChargebackRunOptions, GroupKey, Grouping, TimeRange,
};
use crate::errors::{ChargebackError, ChargebackResult};

use self::cost_calculator::calculate_costs;
use self::grouping::key_and_fields;
use self::rate_resolver::get_rates;
use self::run_context::ChargebackRunContext;
use self::time_range::resolve_range;

/// Providers a run reads from.
#[derive(Clone)]
pub struct ChargebackRepositories {
    pub rollups: Arc<dyn MetricRollupApiRepository>,
    pub rates: Arc<dyn ChargebackRateApiRepository>,
    pub classifications: Arc<dyn ClassificationApiRepository>,
}

/// What a run needs before the first fetch.
struct RunPlan {
    range: TimeRange,
    projection: BTreeSet<RollupColumn>,
    ctx: ChargebackRunContext,
}

fn init<Tz: TimeZone>(
    options: &ChargebackRunOptions<Tz>,
    repos: &ChargebackRepositories,
    now: DateTime<Utc>,
) -> ChargebackResult<RunPlan> {
    let range = resolve_range(&options.range, options.interval, &options.timezone, now)?;

    let mut projection: BTreeSet<RollupColumn> = RollupColumn::FIXED_COMPUTE.into_iter().collect();
    for rate in repos.rates.default_rates()? {
        projection.extend(
            rate.details
                .iter()
                .filter_map(|d| d.metric.as_ref())
                .filter_map(|m| m.backing_column()),
        );
    }

    let classifications = match &options.grouping {
        Grouping::ByTagCategory(category) => repos.classifications.by_type_and_name(category)?,
        Grouping::ByTopology(_) => HashMap::new(),
    };

    info!(
        start = %range.start,
        end = %range.end,
        interval = %options.interval,
        columns = projection.len(),
        "Starting chargeback run"
    );

    Ok(RunPlan {
        range,
        projection,
        ctx: ChargebackRunContext::new(Some(options.enterprise.clone()), classifications),
    })
}

fn window_query<Tz: TimeZone>(
    options: &ChargebackRunOptions<Tz>,
    projection: &BTreeSet<RollupColumn>,
    window: TimeRange,
) -> RollupQuery {
    RollupQuery {
        start: window.start,
        end: window.end,
        capture_interval: CaptureInterval::Hourly,
        columns: projection.clone(),
        filters: options.filters.clone(),
    }
}

/// Fetches one window and keeps the first sample per (resource, timestamp).
fn fetch_window(
    repo: &dyn MetricRollupApiRepository,
    query: &RollupQuery,
) -> ChargebackResult<Vec<MetricRollupEntity>> {
    let fetched = repo.fetch(query)?;
    let fetched_count = fetched.len();

    let mut seen = HashSet::with_capacity(fetched_count);
    let samples: Vec<MetricRollupEntity> = fetched
        .into_iter()
        .filter(|s| seen.insert((s.resource_id, s.timestamp)))
        .collect();

    info!(
        window_start = %query.start,
        window_end = %query.end,
        fetched = fetched_count,
        unique = samples.len(),
        "Fetched rollup window"
    );
    Ok(samples)
}

fn process_samples<Tz: TimeZone>(
    options: &ChargebackRunOptions<Tz>,
    rates_repo: &dyn ChargebackRateApiRepository,
    ctx: &mut ChargebackRunContext,
    results: &mut BTreeMap<GroupKey, AggregateRow>,
    samples: Vec<MetricRollupEntity>,
) -> ChargebackResult<()> {
    for sample in samples {
        let Some(resource) = sample.resource.as_ref() else {
            warn!(
                resource_id = sample.resource_id,
                timestamp = %sample.timestamp,
                "Skipping sample of a deleted resource"
            );
            continue;
        };

        let (key, seed) = key_and_fields(
            &sample,
            options.interval,
            &options.timezone,
            &options.grouping,
            ctx,
        )?;
        let rates = get_rates(ctx, rates_repo, &sample, resource)?;

        let row = results.entry(key).or_insert(seed);
        calculate_costs(&sample, row, &rates, &options.schema)?;
    }
    Ok(())
}

fn flush(results: BTreeMap<GroupKey, AggregateRow>, ctx: &ChargebackRunContext) -> Vec<ChargebackRecord> {
    info!(
        rows = results.len(),
        rate_queries = ctx.rate_queries(),
        rate_cache_hits = ctx.rate_cache_hits(),
        "Chargeback run complete"
    );
    results.into_values().map(ChargebackRecord::from).collect()
}

/// Runs a chargeback report, fetching one day window at a time.
pub fn build_results<Tz: TimeZone>(
    options: &ChargebackRunOptions<Tz>,
    repos: &ChargebackRepositories,
    now: DateTime<Utc>,
) -> ChargebackResult<Vec<ChargebackRecord>> {
    let RunPlan {
        range,
        projection,
        mut ctx,
    } = init(options, repos, now)?;
    let mut results = BTreeMap::new();

    for window in range.day_windows() {
        let query = window_query(options, &projection, window);
        let samples = fetch_window(repos.rollups.as_ref(), &query)?;
        process_samples(options, repos.rates.as_ref(), &mut ctx, &mut results, samples)?;
    }

    Ok(flush(results, &ctx))
}

/// Same result as [`build_results`]; up to `fetch_concurrency` windows are
/// fetched on the blocking pool at once, and folded in chronological order.
pub async fn build_results_concurrent<Tz: TimeZone>(
    options: &ChargebackRunOptions<Tz>,
    repos: &ChargebackRepositories,
    now: DateTime<Utc>,
) -> ChargebackResult<Vec<ChargebackRecord>> {
    let RunPlan {
        range,
        projection,
        mut ctx,
    } = init(options, repos, now)?;
    let mut results = BTreeMap::new();
    let windows = range.day_windows();

    for chunk in windows.chunks(options.fetch_concurrency.max(1)) {
        let handles: Vec<_> = chunk
            .iter()
            .map(|window| {
                let repo = Arc::clone(&repos.rollups);
                let query = window_query(options, &projection, *window);
                tokio::task::spawn_blocking(move || fetch_window(repo.as_ref(), &query))
            })
            .collect();

        for handle in handles {
            let samples = handle
                .await
                .map_err(|err| ChargebackError::Task(err.to_string()))??;
            process_samples(options, repos.rates.as_ref(), &mut ctx, &mut results, samples)?;
        }
    }

    Ok(flush(results, &ctx))
}
