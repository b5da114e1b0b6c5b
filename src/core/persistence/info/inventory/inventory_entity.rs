use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::persistence::metrics::rollup::metric_rollup_entity::{ResourceEntity, TopologyRef};

/// Resources and topology objects known to the data directory.
///
/// Stored at `data/info/inventory.json`. Rollup rows reference resources and
/// parents by id only; this document supplies their names and hardware.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryEntity {
    #[serde(default)]
    pub resources: Vec<ResourceEntity>,
    #[serde(default)]
    pub hosts: Vec<TopologyRef>,
    #[serde(default)]
    pub clusters: Vec<TopologyRef>,
    #[serde(default)]
    pub storages: Vec<TopologyRef>,
    #[serde(default)]
    pub providers: Vec<TopologyRef>,
}

/// Id-indexed view of an [`InventoryEntity`].
#[derive(Debug, Clone, Default)]
pub struct InventoryIndex {
    resources: HashMap<u64, ResourceEntity>,
    hosts: HashMap<u64, TopologyRef>,
    clusters: HashMap<u64, TopologyRef>,
    storages: HashMap<u64, TopologyRef>,
    providers: HashMap<u64, TopologyRef>,
}

fn index(refs: Vec<TopologyRef>) -> HashMap<u64, TopologyRef> {
    refs.into_iter().map(|r| (r.id, r)).collect()
}

/// Unknown parents keep their id with the id as display name.
fn lookup(map: &HashMap<u64, TopologyRef>, id: Option<u64>) -> Option<TopologyRef> {
    id.map(|id| {
        map.get(&id)
            .cloned()
            .unwrap_or_else(|| TopologyRef::new(id, id.to_string()))
    })
}

impl From<InventoryEntity> for InventoryIndex {
    fn from(value: InventoryEntity) -> Self {
        Self {
            resources: value.resources.into_iter().map(|r| (r.id, r)).collect(),
            hosts: index(value.hosts),
            clusters: index(value.clusters),
            storages: index(value.storages),
            providers: index(value.providers),
        }
    }
}

impl InventoryIndex {
    pub fn resource(&self, id: u64) -> Option<&ResourceEntity> {
        self.resources.get(&id)
    }

    pub fn host(&self, id: Option<u64>) -> Option<TopologyRef> {
        lookup(&self.hosts, id)
    }

    pub fn cluster(&self, id: Option<u64>) -> Option<TopologyRef> {
        lookup(&self.clusters, id)
    }

    pub fn storage(&self, id: Option<u64>) -> Option<TopologyRef> {
        lookup(&self.storages, id)
    }

    pub fn provider(&self, id: Option<u64>) -> Option<TopologyRef> {
        lookup(&self.providers, id)
    }
}
