use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metric_rollup_entity::{
    CaptureInterval, MetricRollupEntity, RollupColumn, Tag, TopologyRef,
};

/// Caller-supplied predicates narrowing the rollups of a chargeback run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollupFilter {
    ResourceIds { ids: Vec<u64> },
    Tenant { id: u64 },
    ParentHost { id: u64 },
    ParentCluster { id: u64 },
    ParentStorage { id: u64 },
    ParentProvider { id: u64 },
    Tag { category: String, value: String },
    MetricRange {
        column: RollupColumn,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl RollupFilter {
    pub fn matches(&self, sample: &MetricRollupEntity) -> bool {
        match self {
            Self::ResourceIds { ids } => ids.contains(&sample.resource_id),
            Self::Tenant { id } => sample.tenant().map(|t| t.id == *id).unwrap_or(false),
            Self::ParentHost { id } => parent_is(&sample.parent_host, *id),
            Self::ParentCluster { id } => parent_is(&sample.parent_cluster, *id),
            Self::ParentStorage { id } => parent_is(&sample.parent_storage, *id),
            Self::ParentProvider { id } => parent_is(&sample.parent_provider, *id),
            Self::Tag { category, value } => {
                let wanted = Tag::new(category.clone(), value.clone());
                sample.tags.contains(&wanted)
            }
            Self::MetricRange { column, min, max } => match sample.values.get(*column) {
                Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
                None => false,
            },
        }
    }
}

fn parent_is(parent: &Option<TopologyRef>, id: u64) -> bool {
    parent.as_ref().map(|p| p.id == id).unwrap_or(false)
}

/// A rollup fetch: samples with `start <= timestamp < end` at the given
/// capture interval, restricted to `columns`, matching every filter.
#[derive(Debug, Clone)]
pub struct RollupQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub capture_interval: CaptureInterval,
    pub columns: BTreeSet<RollupColumn>,
    pub filters: Vec<RollupFilter>,
}

impl RollupQuery {
    pub fn accepts(&self, sample: &MetricRollupEntity) -> bool {
        sample.timestamp >= self.start
            && sample.timestamp < self.end
            && sample.capture_interval == self.capture_interval
            && self.filters.iter().all(|f| f.matches(sample))
    }
}

/// Read-only access to hourly rollups.
///
/// Implementations return samples ordered by (resource id, timestamp).
pub trait MetricRollupApiRepository: Send + Sync {
    fn fetch(&self, query: &RollupQuery) -> Result<Vec<MetricRollupEntity>>;
}
