use serde::{Deserialize, Serialize};

use crate::core::persistence::metrics::rollup::chargeable_metric::ChargeableMetric;
use crate::core::persistence::metrics::rollup::metric_rollup_entity::{TopologyRef, MANAGED_TAG_PREFIX};
use crate::core::util::cost_util::CostUtil;

/// Rate types; a target resolves at most one rate per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateType {
    Compute,
    Storage,
}

impl RateType {
    pub const ALL: [RateType; 2] = [Self::Compute, Self::Storage];
}

/// Group a rate detail rolls up into (`<group>_metric` / `<group>_cost`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RateGroup {
    Compute,
    Cpu,
    CpuCores,
    Memory,
    DiskIo,
    NetIo,
    Storage,
    Fixed,
    Custom(String),
}

impl RateGroup {
    /// Built-in groups match case-insensitively; custom names keep their case.
    pub fn from_code<S: AsRef<str>>(code: S) -> Self {
        let code = code.as_ref();
        match code.to_lowercase().as_str() {
            "compute" => Self::Compute,
            "cpu" => Self::Cpu,
            "cpu_cores" => Self::CpuCores,
            "memory" => Self::Memory,
            "disk_io" => Self::DiskIo,
            "net_io" => Self::NetIo,
            "storage" => Self::Storage,
            "fixed" => Self::Fixed,
            _ => Self::Custom(code.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            Self::Compute => "compute",
            Self::Cpu => "cpu",
            Self::CpuCores => "cpu_cores",
            Self::Memory => "memory",
            Self::DiskIo => "disk_io",
            Self::NetIo => "net_io",
            Self::Storage => "storage",
            Self::Fixed => "fixed",
            Self::Custom(code) => code.as_str(),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed)
    }
}

impl From<String> for RateGroup {
    fn from(value: String) -> Self {
        Self::from_code(value)
    }
}

impl From<RateGroup> for String {
    fn from(value: RateGroup) -> Self {
        value.as_code().to_string()
    }
}

/// Period a rate is quoted for. Samples are hourly, so every rate is spread
/// over the hours of its period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateTime {
    #[default]
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RateTime {
    pub fn hours(&self) -> f64 {
        match self {
            Self::Hourly => 1.0,
            Self::Daily => 24.0,
            Self::Weekly => 168.0,
            Self::Monthly => 720.0,
            Self::Yearly => 8760.0,
        }
    }
}

/// Unit the rate is quoted in, relative to the raw metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    #[default]
    Base,
    /// Metric is in bytes, rate is per GB.
    Gigabytes,
}

impl MetricUnit {
    pub fn convert(&self, value: f64) -> f64 {
        match self {
            Self::Base => value,
            Self::Gigabytes => CostUtil::bytes_to_gb(value),
        }
    }
}

/// Maps a usage value of one hourly sample to a cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostFunction {
    PerUnit {
        rate: f64,
        #[serde(default)]
        per_time: RateTime,
        #[serde(default)]
        unit: MetricUnit,
    },
    Flat {
        amount: f64,
        #[serde(default)]
        per_time: RateTime,
    },
}

impl CostFunction {
    pub fn cost(&self, metric: f64) -> f64 {
        match self {
            Self::PerUnit {
                rate,
                per_time,
                unit,
            } => CostUtil::per_unit_hourly_cost(unit.convert(metric), *rate, per_time.hours()),
            Self::Flat { amount, per_time } => CostUtil::hourly_rate(*amount, per_time.hours()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateDetailEntity {
    /// Column prefix for this detail (`<rate_name>_metric`, `<rate_name>_cost`).
    pub rate_name: String,
    pub group: RateGroup,
    /// `None` for flat charges.
    #[serde(default)]
    pub metric: Option<ChargeableMetric>,
    pub cost: CostFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargebackRateEntity {
    pub id: String,
    pub description: String,
    pub rate_type: RateType,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub details: Vec<RateDetailEntity>,
}

/// Kind of topology object a rate can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentKind {
    Host,
    Cluster,
    Storage,
    Provider,
    Enterprise,
    Tenant,
}

/// An ancestor of a resource considered for rate assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateParent {
    pub kind: ParentKind,
    pub target: TopologyRef,
}

impl RateParent {
    pub fn new(kind: ParentKind, target: TopologyRef) -> Self {
        Self { kind, target }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentTarget {
    /// `department/finance` or the full managed reference.
    Tag { tag: String },
    Object { parent: ParentKind, id: u64 },
}

impl AssignmentTarget {
    fn matches_tag(&self, managed_reference: &str) -> bool {
        match self {
            Self::Tag { tag } if tag.starts_with(MANAGED_TAG_PREFIX) => tag == managed_reference,
            Self::Tag { tag } => managed_reference
                .strip_prefix(MANAGED_TAG_PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| rest == tag)
                .unwrap_or(false),
            Self::Object { .. } => false,
        }
    }

    fn matches_parent(&self, parent: &RateParent) -> bool {
        match self {
            Self::Object { parent: kind, id } => *kind == parent.kind && *id == parent.target.id,
            Self::Tag { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAssignmentEntity {
    pub rate_id: String,
    pub target: AssignmentTarget,
}

/// Rate definitions plus their assignments, stored at
/// `data/info/chargeback_rates.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargebackRateCatalogEntity {
    #[serde(default)]
    pub rates: Vec<ChargebackRateEntity>,
    #[serde(default)]
    pub assignments: Vec<RateAssignmentEntity>,
}

impl ChargebackRateCatalogEntity {
    pub fn rate(&self, id: &str) -> Option<&ChargebackRateEntity> {
        self.rates.iter().find(|r| r.id == id)
    }

    pub fn default_rates(&self) -> Vec<ChargebackRateEntity> {
        self.rates.iter().filter(|r| r.default).cloned().collect()
    }

    /// Resolves the rates assigned to a target, one per rate type.
    ///
    /// For each type a tag assignment wins (first tag of `tag_list` that has
    /// one), otherwise the first parent in `parents` order with an assignment.
    pub fn assigned_for_target(
        &self,
        tag_list: &[String],
        parents: &[RateParent],
    ) -> Vec<ChargebackRateEntity> {
        let mut out = Vec::new();

        for rate_type in RateType::ALL {
            let by_tag = tag_list.iter().find_map(|reference| {
                self.assigned_rate(rate_type, |target| target.matches_tag(reference))
            });

            let chosen = by_tag.or_else(|| {
                parents.iter().find_map(|parent| {
                    self.assigned_rate(rate_type, |target| target.matches_parent(parent))
                })
            });

            if let Some(rate) = chosen {
                out.push(rate.clone());
            }
        }

        out
    }

    fn assigned_rate<F>(&self, rate_type: RateType, pred: F) -> Option<&ChargebackRateEntity>
    where
        F: Fn(&AssignmentTarget) -> bool,
    {
        self.assignments
            .iter()
            .filter(|a| pred(&a.target))
            .find_map(|a| self.rate(&a.rate_id).filter(|r| r.rate_type == rate_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(id: &str, rate_type: RateType) -> ChargebackRateEntity {
        ChargebackRateEntity {
            id: id.into(),
            description: format!("{id} rate"),
            rate_type,
            default: false,
            details: vec![],
        }
    }

    fn catalog() -> ChargebackRateCatalogEntity {
        ChargebackRateCatalogEntity {
            rates: vec![
                rate("finance-compute", RateType::Compute),
                rate("cluster-compute", RateType::Compute),
                rate("enterprise-compute", RateType::Compute),
                rate("enterprise-storage", RateType::Storage),
            ],
            assignments: vec![
                RateAssignmentEntity {
                    rate_id: "finance-compute".into(),
                    target: AssignmentTarget::Tag {
                        tag: "department/finance".into(),
                    },
                },
                RateAssignmentEntity {
                    rate_id: "cluster-compute".into(),
                    target: AssignmentTarget::Object {
                        parent: ParentKind::Cluster,
                        id: 20,
                    },
                },
                RateAssignmentEntity {
                    rate_id: "enterprise-compute".into(),
                    target: AssignmentTarget::Object {
                        parent: ParentKind::Enterprise,
                        id: 1,
                    },
                },
                RateAssignmentEntity {
                    rate_id: "enterprise-storage".into(),
                    target: AssignmentTarget::Object {
                        parent: ParentKind::Enterprise,
                        id: 1,
                    },
                },
            ],
        }
    }

    fn parents() -> Vec<RateParent> {
        vec![
            RateParent::new(ParentKind::Cluster, TopologyRef::new(20, "cl-20")),
            RateParent::new(ParentKind::Enterprise, TopologyRef::new(1, "Enterprise")),
        ]
    }

    #[test]
    fn tag_assignment_wins_over_parents() {
        let tags = vec!["vm/tag/managed/department/finance".to_string()];
        let ids: Vec<String> = catalog()
            .assigned_for_target(&tags, &parents())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["finance-compute", "enterprise-storage"]);
    }

    #[test]
    fn nearest_parent_wins_without_tags() {
        let ids: Vec<String> = catalog()
            .assigned_for_target(&[], &parents())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["cluster-compute", "enterprise-storage"]);
    }

    #[test]
    fn cost_functions_spread_rates_over_hours() {
        let per_unit = CostFunction::PerUnit {
            rate: 0.1,
            per_time: RateTime::Hourly,
            unit: MetricUnit::Base,
        };
        assert!((per_unit.cost(4.0) - 0.4).abs() < 1e-12);

        let monthly_gb = CostFunction::PerUnit {
            rate: 72.0,
            per_time: RateTime::Monthly,
            unit: MetricUnit::Gigabytes,
        };
        assert!((monthly_gb.cost(1_073_741_824.0) - 0.1).abs() < 1e-12);

        let flat = CostFunction::Flat {
            amount: 24.0,
            per_time: RateTime::Daily,
        };
        assert_eq!(flat.cost(0.0), 1.0);
        assert_eq!(flat.cost(999.0), 1.0);
    }

    #[test]
    fn rate_json_round_trips_typed_fields() {
        let raw = r#"{
            "id": "default-compute",
            "description": "Default Compute",
            "rate_type": "compute",
            "default": true,
            "details": [
                { "rate_name": "cpu_used", "group": "cpu", "metric": "cpu_usagemhz_rate_average",
                  "cost": { "kind": "per_unit", "rate": 0.02 } },
                { "rate_name": "fixed_compute_1", "group": "fixed",
                  "cost": { "kind": "flat", "amount": 30, "per_time": "monthly" } }
            ]
        }"#;
        let parsed: ChargebackRateEntity = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.details[0].group, RateGroup::Cpu);
        assert_eq!(
            parsed.details[0].metric.as_ref().map(|m| m.as_code()),
            Some("cpu_usagemhz_rate_average")
        );
        assert!(parsed.details[1].group.is_fixed());
        assert!(parsed.details[1].metric.is_none());
    }

    #[test]
    fn custom_group_names_keep_their_case() {
        assert_eq!(RateGroup::from_code("Memory"), RateGroup::Memory);
        assert_eq!(RateGroup::from_code("GPU"), RateGroup::Custom("GPU".into()));

        let detail: RateDetailEntity = serde_json::from_value(serde_json::json!({
            "rate_name": "GPU",
            "group": "GPU",
            "metric": "gpu_hours",
            "cost": { "kind": "per_unit", "rate": 2.0 }
        }))
        .unwrap();
        assert_eq!(detail.group.as_code(), "GPU");
        assert_eq!(serde_json::to_value(&detail.group).unwrap(), "GPU");
    }
}
