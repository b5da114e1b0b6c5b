use std::path::Path;

use anyhow::Result;
use tracing::error;

use crate::core::persistence::info::info_fixed_fs_adapter_trait::InfoFixedFsAdapterTrait;
use crate::core::persistence::info::inventory::inventory_entity::InventoryIndex;
use crate::core::persistence::info::inventory::inventory_fs_adapter::InventoryFsAdapter;

use super::metric_rollup_api_repository_trait::{MetricRollupApiRepository, RollupQuery};
use super::metric_rollup_entity::MetricRollupEntity;
use super::metric_rollup_fs_adapter::{MetricRollupFsAdapter, MetricRollupRow};

/// File-backed rollup store joined with the inventory snapshot.
pub struct MetricRollupRepository {
    adapter: MetricRollupFsAdapter,
    inventory: InventoryIndex,
}

impl MetricRollupRepository {
    pub fn new(base: &Path) -> Result<Self> {
        let inventory = InventoryFsAdapter::new(base).read().map_err(|err| {
            error!(error = %err, "Failed to read inventory");
            err
        })?;

        Ok(Self {
            adapter: MetricRollupFsAdapter::new(base),
            inventory: inventory.into(),
        })
    }

    fn to_entity(&self, row: MetricRollupRow) -> MetricRollupEntity {
        MetricRollupEntity {
            timestamp: row.time,
            capture_interval: row.capture_interval,
            resource_id: row.resource_id,
            resource: self.inventory.resource(row.resource_id).cloned(),
            tags: row.tags,
            parent_host: self.inventory.host(row.parent_host_id),
            parent_cluster: self.inventory.cluster(row.parent_cluster_id),
            parent_storage: self.inventory.storage(row.parent_storage_id),
            parent_provider: self.inventory.provider(row.parent_provider_id),
            values: row.values,
        }
    }
}

impl MetricRollupApiRepository for MetricRollupRepository {
    fn fetch(&self, query: &RollupQuery) -> Result<Vec<MetricRollupEntity>> {
        let resource_ids = self.adapter.resource_ids().map_err(|err| {
            error!(error = %err, "Failed to list rollup resources");
            err
        })?;

        let mut samples = Vec::new();
        for resource_id in resource_ids {
            let rows = self
                .adapter
                .get_row_between(resource_id, query.start, query.end)
                .map_err(|err| {
                    error!(error = %err, resource_id, "Failed to read rollup rows");
                    err
                })?;

            for row in rows {
                let mut sample = self.to_entity(row);
                if !query.accepts(&sample) {
                    continue;
                }
                sample
                    .values
                    .retain_columns(|c| query.columns.contains(&c));
                samples.push(sample);
            }
        }

        samples.sort_by(|a, b| {
            a.resource_id
                .cmp(&b.resource_id)
                .then(a.timestamp.cmp(&b.timestamp))
        });
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::info::inventory::inventory_entity::InventoryEntity;
    use crate::core::persistence::metrics::rollup::metric_rollup_api_repository_trait::RollupFilter;
    use crate::core::persistence::metrics::rollup::metric_rollup_entity::{
        CaptureInterval, HardwareEntity, ResourceEntity, RollupColumn, RollupValues, Tag,
        TopologyRef,
    };
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn row(resource_id: u64, hour: u32, host: u64) -> MetricRollupRow {
        MetricRollupRow {
            time: Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap(),
            capture_interval: CaptureInterval::Hourly,
            resource_id,
            tags: vec![Tag::new("department", "finance")],
            parent_host_id: Some(host),
            parent_cluster_id: None,
            parent_storage_id: None,
            parent_provider_id: None,
            values: RollupValues {
                cpu_usagemhz_rate_average: Some(100.0),
                derived_memory_used: Some(512.0),
                ..Default::default()
            },
        }
    }

    fn seed(dir: &Path) {
        InventoryFsAdapter::new(dir)
            .update(&InventoryEntity {
                resources: vec![ResourceEntity {
                    id: 1,
                    name: "vm-one".into(),
                    resource_type: "vm".into(),
                    tenant: Some(TopologyRef::new(5, "ops")),
                    hardware: HardwareEntity::default(),
                }],
                hosts: vec![TopologyRef::new(10, "esx-10")],
                ..Default::default()
            })
            .unwrap();

        let adapter = MetricRollupFsAdapter::new(dir);
        adapter.append_row(&row(2, 1, 11)).unwrap();
        adapter.append_row(&row(1, 2, 10)).unwrap();
        adapter.append_row(&row(1, 1, 10)).unwrap();
    }

    fn query(filters: Vec<RollupFilter>) -> RollupQuery {
        RollupQuery {
            start: Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap(),
            capture_interval: CaptureInterval::Hourly,
            columns: BTreeSet::from([RollupColumn::CpuUsagemhzRateAverage]),
            filters,
        }
    }

    #[test]
    fn joins_inventory_and_orders_by_resource_then_time() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let repo = MetricRollupRepository::new(dir.path()).unwrap();

        let samples = repo.fetch(&query(vec![])).unwrap();
        let keys: Vec<(u64, u32)> = samples
            .iter()
            .map(|s| (s.resource_id, chrono::Timelike::hour(&s.timestamp)))
            .collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);

        assert_eq!(samples[0].resource.as_ref().unwrap().name, "vm-one");
        assert_eq!(samples[0].parent_host, Some(TopologyRef::new(10, "esx-10")));
        // Resource 2 is not in the inventory.
        assert!(samples[2].resource.is_none());
        assert_eq!(samples[2].parent_host, Some(TopologyRef::new(11, "11")));
    }

    #[test]
    fn applies_projection_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let repo = MetricRollupRepository::new(dir.path()).unwrap();

        let samples = repo
            .fetch(&query(vec![RollupFilter::Tenant { id: 5 }]))
            .unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.resource_id == 1));
        assert_eq!(samples[0].values.cpu_usagemhz_rate_average, Some(100.0));
        assert_eq!(samples[0].values.derived_memory_used, None);
    }
}
