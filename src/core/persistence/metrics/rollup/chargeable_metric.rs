use serde::{Deserialize, Serialize};

use super::metric_rollup_entity::{MetricRollupEntity, ResourceColumn, RollupColumn};

pub const DERIVED_CPU_TOTAL_CORES_USED: &str = "v_derived_cpu_total_cores_used";

/// A metric a rate detail can be priced on.
///
/// Rate definitions name metrics as text; the name is resolved once into one
/// of these variants so usage is read through typed accessors. Names that map
/// to nothing are kept as `Unsupported` and priced at zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChargeableMetric {
    Rollup(RollupColumn),
    Resource(ResourceColumn),
    /// `cpu_usage_rate_average` (percent) applied to the resource's core count.
    DerivedCpuTotalCoresUsed,
    Unsupported(String),
}

/// Result of reading a metric off a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricReading {
    Value(f64),
    Unsupported,
}

impl ChargeableMetric {
    pub fn from_code<S: AsRef<str>>(code: S) -> Self {
        let code = code.as_ref().trim();
        if code.eq_ignore_ascii_case(DERIVED_CPU_TOTAL_CORES_USED) {
            return Self::DerivedCpuTotalCoresUsed;
        }
        if let Some(column) = RollupColumn::from_code(code) {
            return Self::Rollup(column);
        }
        if let Some(column) = ResourceColumn::from_code(code) {
            return Self::Resource(column);
        }
        Self::Unsupported(code.to_string())
    }

    pub fn as_code(&self) -> &str {
        match self {
            Self::Rollup(column) => column.as_code(),
            Self::Resource(column) => column.as_code(),
            Self::DerivedCpuTotalCoresUsed => DERIVED_CPU_TOTAL_CORES_USED,
            Self::Unsupported(code) => code.as_str(),
        }
    }

    /// The rollup column that has to be fetched for this metric, if any.
    /// Virtual columns are fetched through the column they are derived from.
    pub fn backing_column(&self) -> Option<RollupColumn> {
        match self {
            Self::Rollup(column) => Some(*column),
            Self::DerivedCpuTotalCoresUsed => Some(RollupColumn::CpuUsageRateAverage),
            Self::Resource(_) | Self::Unsupported(_) => None,
        }
    }
}

impl From<String> for ChargeableMetric {
    fn from(value: String) -> Self {
        Self::from_code(value)
    }
}

impl From<ChargeableMetric> for String {
    fn from(value: ChargeableMetric) -> Self {
        value.as_code().to_string()
    }
}

impl MetricRollupEntity {
    /// Reads a metric, preferring the rollup row and falling back to the
    /// resource for hardware columns. Missing values read as zero.
    pub fn metric_value(&self, metric: &ChargeableMetric) -> MetricReading {
        let value = match metric {
            ChargeableMetric::Rollup(column) => self.values.get(*column),
            ChargeableMetric::Resource(column) => {
                self.resource.as_ref().and_then(|r| r.column(*column))
            }
            ChargeableMetric::DerivedCpuTotalCoresUsed => {
                let rate = self.values.cpu_usage_rate_average;
                let cores = self
                    .resource
                    .as_ref()
                    .and_then(|r| r.hardware.cpu_total_cores);
                match (rate, cores) {
                    (Some(rate), Some(cores)) => Some(rate * cores / 100.0),
                    _ => None,
                }
            }
            ChargeableMetric::Unsupported(_) => return MetricReading::Unsupported,
        };

        MetricReading::Value(value.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::metrics::rollup::metric_rollup_entity::{
        CaptureInterval, HardwareEntity, ResourceEntity, RollupValues,
    };
    use chrono::{TimeZone, Utc};

    fn sample() -> MetricRollupEntity {
        MetricRollupEntity {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            capture_interval: CaptureInterval::Hourly,
            resource_id: 7,
            resource: Some(ResourceEntity {
                id: 7,
                name: "vm-7".into(),
                resource_type: "vm".into(),
                tenant: None,
                hardware: HardwareEntity {
                    cpu_total_cores: Some(4.0),
                    ram_size: Some(8192.0),
                    allocated_disk_storage: None,
                },
            }),
            tags: vec![],
            parent_host: None,
            parent_cluster: None,
            parent_storage: None,
            parent_provider: None,
            values: RollupValues {
                cpu_usage_rate_average: Some(50.0),
                ..Default::default()
            },
        }
    }

    #[test]
    fn metric_names_resolve_to_typed_variants() {
        assert_eq!(
            ChargeableMetric::from_code("cpu_usagemhz_rate_average"),
            ChargeableMetric::Rollup(RollupColumn::CpuUsagemhzRateAverage)
        );
        assert_eq!(
            ChargeableMetric::from_code("ram_size"),
            ChargeableMetric::Resource(ResourceColumn::RamSize)
        );
        assert_eq!(
            ChargeableMetric::from_code("v_derived_cpu_total_cores_used"),
            ChargeableMetric::DerivedCpuTotalCoresUsed
        );
        assert_eq!(
            ChargeableMetric::from_code("gpu_hours"),
            ChargeableMetric::Unsupported("gpu_hours".into())
        );
    }

    #[test]
    fn reads_rollup_then_resource_and_derived_values() {
        let s = sample();
        assert_eq!(
            s.metric_value(&ChargeableMetric::Rollup(RollupColumn::CpuUsageRateAverage)),
            MetricReading::Value(50.0)
        );
        assert_eq!(
            s.metric_value(&ChargeableMetric::Resource(ResourceColumn::RamSize)),
            MetricReading::Value(8192.0)
        );
        assert_eq!(
            s.metric_value(&ChargeableMetric::DerivedCpuTotalCoresUsed),
            MetricReading::Value(2.0)
        );
        // Missing values read as zero, unknown names are flagged.
        assert_eq!(
            s.metric_value(&ChargeableMetric::Rollup(RollupColumn::NetUsageRateAverage)),
            MetricReading::Value(0.0)
        );
        assert_eq!(
            s.metric_value(&ChargeableMetric::Unsupported("gpu_hours".into())),
            MetricReading::Unsupported
        );
    }

    #[test]
    fn virtual_metric_is_backed_by_cpu_usage_rate() {
        assert_eq!(
            ChargeableMetric::DerivedCpuTotalCoresUsed.backing_column(),
            Some(RollupColumn::CpuUsageRateAverage)
        );
        assert_eq!(
            ChargeableMetric::Resource(ResourceColumn::CpuTotalCores).backing_column(),
            None
        );
    }
}
