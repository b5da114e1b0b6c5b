use tracing::debug;

use crate::core::persistence::info::rates::chargeback_rate_entity::{ChargebackRateEntity, RateDetailEntity};
use crate::core::persistence::metrics::rollup::chargeable_metric::MetricReading;
use crate::core::persistence::metrics::rollup::metric_rollup_entity::{
    CaptureInterval, MetricRollupEntity, RollupColumn,
};
use crate::domain::chargeback::model::{AggregateRow, ReportSchema, TOTAL_COST_COLUMN};
use crate::errors::{ChargebackError, ChargebackResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnWrite {
    /// Last sample wins.
    Replace,
    Accumulate,
}

/// True when the sample shows any activity, which makes it eligible for fixed costs.
pub fn calc_fixed_compute(sample: &MetricRollupEntity) -> bool {
    RollupColumn::FIXED_COMPUTE
        .iter()
        .any(|c| sample.values.get(*c).map(|v| v != 0.0).unwrap_or(false))
}

/// Prices one hourly sample against its rates and merges the result into `row`.
pub fn calculate_costs(
    sample: &MetricRollupEntity,
    row: &mut AggregateRow,
    rates: &[ChargebackRateEntity],
    schema: &ReportSchema,
) -> ChargebackResult<()> {
    if sample.capture_interval != CaptureInterval::Hourly {
        return Err(ChargebackError::UnsupportedGranularity {
            interval: sample.capture_interval.as_code().to_string(),
            resource: sample.resource_label(),
            timestamp: sample.timestamp,
        });
    }

    let fixed_compute = calc_fixed_compute(sample);
    if fixed_compute {
        row.fixed_compute_metric += 1;
    }

    for rate in rates {
        row.add_rate_description(&rate.description);

        for detail in &rate.details {
            let (metric, cost) = price_detail(sample, detail, fixed_compute);

            let metric_key = format!("{}_metric", detail.rate_name);
            let cost_key = format!("{}_cost", detail.rate_name);
            if !schema.contains(&metric_key) && !schema.contains(&cost_key) {
                continue;
            }

            for (column, value, write) in candidate_columns(detail, metric, cost) {
                if !schema.contains(&column) {
                    continue;
                }
                match write {
                    ColumnWrite::Replace => row.set(&column, value),
                    ColumnWrite::Accumulate => row.add(&column, value),
                }
            }
        }
    }

    Ok(())
}

/// Usage and cost of one rate detail for one sample.
fn price_detail(
    sample: &MetricRollupEntity,
    detail: &RateDetailEntity,
    fixed_compute: bool,
) -> (f64, f64) {
    let metric = match &detail.metric {
        None => 0.0,
        Some(metric) => match sample.metric_value(metric) {
            MetricReading::Value(value) => value,
            MetricReading::Unsupported => {
                debug!(
                    metric = metric.as_code(),
                    rate_name = %detail.rate_name,
                    "Unknown chargeable metric, pricing at zero"
                );
                return (0.0, 0.0);
            }
        },
    };

    let cost = if detail.group.is_fixed() && !fixed_compute {
        0.0
    } else {
        detail.cost.cost(metric)
    };

    (metric, cost)
}

/// Report columns a detail feeds, first occurrence of a name wins.
fn candidate_columns(
    detail: &RateDetailEntity,
    metric: f64,
    cost: f64,
) -> Vec<(String, f64, ColumnWrite)> {
    let group = detail.group.as_code();
    let candidates = [
        (format!("{}_metric", detail.rate_name), metric, ColumnWrite::Replace),
        (format!("{group}_metric"), metric, ColumnWrite::Accumulate),
        (format!("{}_cost", detail.rate_name), cost, ColumnWrite::Accumulate),
        (format!("{group}_cost"), cost, ColumnWrite::Accumulate),
        (TOTAL_COST_COLUMN.to_string(), cost, ColumnWrite::Accumulate),
    ];

    let mut out: Vec<(String, f64, ColumnWrite)> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !out.iter().any(|(name, _, _)| *name == candidate.0) {
            out.push(candidate);
        }
    }
    out
}
