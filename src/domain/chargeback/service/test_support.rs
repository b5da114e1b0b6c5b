//! Hand-written repository mocks shared by the chargeback service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::core::persistence::info::classification::classification_api_repository_trait::ClassificationApiRepository;
use crate::core::persistence::info::classification::classification_entity::ClassificationEntity;
use crate::core::persistence::info::rates::chargeback_rate_api_repository_trait::ChargebackRateApiRepository;
use crate::core::persistence::info::rates::chargeback_rate_entity::{
    ChargebackRateEntity, CostFunction, MetricUnit, RateDetailEntity, RateGroup, RateParent,
    RateTime, RateType,
};
use crate::core::persistence::metrics::rollup::chargeable_metric::ChargeableMetric;
use crate::core::persistence::metrics::rollup::metric_rollup_api_repository_trait::{
    MetricRollupApiRepository, RollupQuery,
};
use crate::core::persistence::metrics::rollup::metric_rollup_entity::{
    CaptureInterval, HardwareEntity, MetricRollupEntity, ResourceEntity, RollupValues, Tag,
    TopologyRef,
};

pub struct MockRollupRepository {
    samples: Vec<MetricRollupEntity>,
    pub queries: Mutex<Vec<RollupQuery>>,
    pub fail: bool,
}

impl MockRollupRepository {
    pub fn new(samples: Vec<MetricRollupEntity>) -> Self {
        Self {
            samples,
            queries: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl MetricRollupApiRepository for MockRollupRepository {
    fn fetch(&self, query: &RollupQuery) -> Result<Vec<MetricRollupEntity>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            anyhow::bail!("rollup store unavailable");
        }
        Ok(self
            .samples
            .iter()
            .filter(|s| query.accepts(s))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MockRateRepository {
    pub assigned: Vec<ChargebackRateEntity>,
    pub defaults: Vec<ChargebackRateEntity>,
    pub calls: Mutex<Vec<(Vec<String>, Vec<RateParent>)>>,
}

impl MockRateRepository {
    pub fn new(rates: Vec<ChargebackRateEntity>) -> Self {
        Self {
            defaults: rates.clone(),
            assigned: rates,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChargebackRateApiRepository for MockRateRepository {
    fn assigned_rates(
        &self,
        _resource: &ResourceEntity,
        tag_list: &[String],
        parents: &[RateParent],
    ) -> Result<Vec<ChargebackRateEntity>> {
        self.calls
            .lock()
            .unwrap()
            .push((tag_list.to_vec(), parents.to_vec()));
        Ok(self.assigned.clone())
    }

    fn default_rates(&self) -> Result<Vec<ChargebackRateEntity>> {
        Ok(self.defaults.clone())
    }
}

#[derive(Default)]
pub struct MockClassificationRepository {
    pub entries: Vec<ClassificationEntity>,
    pub calls: Mutex<usize>,
}

impl ClassificationApiRepository for MockClassificationRepository {
    fn by_type_and_name(&self, category: &str) -> Result<HashMap<String, ClassificationEntity>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self
            .entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| (e.name.clone(), e.clone()))
            .collect())
    }
}

pub fn resource(id: u64) -> ResourceEntity {
    ResourceEntity {
        id,
        name: format!("vm-{id}"),
        resource_type: "vm".into(),
        tenant: None,
        hardware: HardwareEntity {
            cpu_total_cores: Some(4.0),
            ..Default::default()
        },
    }
}

/// An hourly sample of resource `resource_id` with the given vCPU count.
pub fn sample(resource_id: u64, timestamp: DateTime<Utc>, vcpus: f64) -> MetricRollupEntity {
    MetricRollupEntity {
        timestamp,
        capture_interval: CaptureInterval::Hourly,
        resource_id,
        resource: Some(resource(resource_id)),
        tags: vec![Tag::new("department", "finance")],
        parent_host: Some(TopologyRef::new(10, "esx-10")),
        parent_cluster: Some(TopologyRef::new(20, "cl-20")),
        parent_storage: None,
        parent_provider: Some(TopologyRef::new(40, "vcenter")),
        values: RollupValues {
            derived_vm_numvcpus: Some(vcpus),
            ..Default::default()
        },
    }
}

pub fn detail(rate_name: &str, group: RateGroup, metric: Option<&str>, rate: f64) -> RateDetailEntity {
    RateDetailEntity {
        rate_name: rate_name.into(),
        group,
        metric: metric.map(ChargeableMetric::from_code),
        cost: CostFunction::PerUnit {
            rate,
            per_time: RateTime::Hourly,
            unit: MetricUnit::Base,
        },
    }
}

pub fn rate(id: &str, description: &str, details: Vec<RateDetailEntity>) -> ChargebackRateEntity {
    ChargebackRateEntity {
        id: id.into(),
        description: description.into(),
        rate_type: RateType::Compute,
        default: true,
        details,
    }
}

/// `$0.10` per vCPU-hour, reported as `compute_metric` / `compute_cost`.
pub fn compute_rate() -> ChargebackRateEntity {
    rate(
        "default-compute",
        "Default Compute",
        vec![detail(
            "compute",
            RateGroup::Compute,
            Some("derived_vm_numvcpus"),
            0.1,
        )],
    )
}
