use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FOLDER_PATH_TAG_PREFIX: &str = "folder_path_";
pub const MANAGED_TAG_PREFIX: &str = "vm/tag/managed";

/// A classification tag attached to a resource at capture time.
///
/// Stored on disk as `category/value` (e.g. `department/finance`); parsed once
/// at the repository boundary so the engine never splits path strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub category: String,
    pub value: String,
}

impl Tag {
    pub fn new(category: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        match raw.split_once('/') {
            Some((category, value)) => Some(Self::new(category, value)),
            None => Some(Self::new(raw, "")),
        }
    }

    /// Folder-path tags describe inventory placement, not billing intent.
    pub fn is_folder_path(&self) -> bool {
        self.category.starts_with(FOLDER_PATH_TAG_PREFIX)
    }

    /// Reference used by rate assignments, e.g. `vm/tag/managed/department/finance`.
    pub fn managed_reference(&self) -> String {
        format!("{}/{}", MANAGED_TAG_PREFIX, self.as_code())
    }

    pub fn as_code(&self) -> String {
        format!("{}/{}", self.category, self.value)
    }
}

/// Granularity a rollup row was captured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureInterval {
    Realtime,
    Hourly,
    Daily,
}

impl CaptureInterval {
    pub fn from_code<S: AsRef<str>>(code: S) -> Option<Self> {
        match code.as_ref().to_lowercase().as_str() {
            "realtime" => Some(Self::Realtime),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

/// Utilization columns carried by an hourly rollup row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupColumn {
    CpuUsagemhzRateAverage,
    CpuUsageRateAverage,
    DerivedVmNumvcpus,
    DerivedMemoryAvailable,
    DerivedMemoryUsed,
    DiskUsageRateAverage,
    NetUsageRateAverage,
    DerivedVmUsedDiskStorage,
    DerivedVmAllocatedDiskStorage,
    DerivedCpuAvailable,
    DerivedCpuReserved,
    DerivedMemoryReserved,
}

impl RollupColumn {
    /// On-disk column order after the fixed identity columns.
    pub const ALL: [RollupColumn; 12] = [
        Self::CpuUsagemhzRateAverage,
        Self::CpuUsageRateAverage,
        Self::DerivedVmNumvcpus,
        Self::DerivedMemoryAvailable,
        Self::DerivedMemoryUsed,
        Self::DiskUsageRateAverage,
        Self::NetUsageRateAverage,
        Self::DerivedVmUsedDiskStorage,
        Self::DerivedVmAllocatedDiskStorage,
        Self::DerivedCpuAvailable,
        Self::DerivedCpuReserved,
        Self::DerivedMemoryReserved,
    ];

    /// Activity signals that make a sample eligible for fixed-cost allocation.
    pub const FIXED_COMPUTE: [RollupColumn; 9] = [
        Self::DerivedVmNumvcpus,
        Self::CpuUsagemhzRateAverage,
        Self::CpuUsageRateAverage,
        Self::DiskUsageRateAverage,
        Self::DerivedMemoryAvailable,
        Self::DerivedMemoryUsed,
        Self::NetUsageRateAverage,
        Self::DerivedVmUsedDiskStorage,
        Self::DerivedVmAllocatedDiskStorage,
    ];

    pub fn from_code<S: AsRef<str>>(code: S) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_code().eq_ignore_ascii_case(code.as_ref()))
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::CpuUsagemhzRateAverage => "cpu_usagemhz_rate_average",
            Self::CpuUsageRateAverage => "cpu_usage_rate_average",
            Self::DerivedVmNumvcpus => "derived_vm_numvcpus",
            Self::DerivedMemoryAvailable => "derived_memory_available",
            Self::DerivedMemoryUsed => "derived_memory_used",
            Self::DiskUsageRateAverage => "disk_usage_rate_average",
            Self::NetUsageRateAverage => "net_usage_rate_average",
            Self::DerivedVmUsedDiskStorage => "derived_vm_used_disk_storage",
            Self::DerivedVmAllocatedDiskStorage => "derived_vm_allocated_disk_storage",
            Self::DerivedCpuAvailable => "derived_cpu_available",
            Self::DerivedCpuReserved => "derived_cpu_reserved",
            Self::DerivedMemoryReserved => "derived_memory_reserved",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollupValues {
    pub cpu_usagemhz_rate_average: Option<f64>,
    pub cpu_usage_rate_average: Option<f64>,
    pub derived_vm_numvcpus: Option<f64>,
    pub derived_memory_available: Option<f64>,
    pub derived_memory_used: Option<f64>,
    pub disk_usage_rate_average: Option<f64>,
    pub net_usage_rate_average: Option<f64>,
    pub derived_vm_used_disk_storage: Option<f64>,
    pub derived_vm_allocated_disk_storage: Option<f64>,
    pub derived_cpu_available: Option<f64>,
    pub derived_cpu_reserved: Option<f64>,
    pub derived_memory_reserved: Option<f64>,
}

impl RollupValues {
    pub fn get(&self, column: RollupColumn) -> Option<f64> {
        *self.slot(column)
    }

    pub fn set(&mut self, column: RollupColumn, value: Option<f64>) {
        *self.slot_mut(column) = value;
    }

    /// Blank every column outside the projection.
    pub fn retain_columns<F: Fn(RollupColumn) -> bool>(&mut self, keep: F) {
        for column in RollupColumn::ALL {
            if !keep(column) {
                self.set(column, None);
            }
        }
    }

    fn slot(&self, column: RollupColumn) -> &Option<f64> {
        match column {
            RollupColumn::CpuUsagemhzRateAverage => &self.cpu_usagemhz_rate_average,
            RollupColumn::CpuUsageRateAverage => &self.cpu_usage_rate_average,
            RollupColumn::DerivedVmNumvcpus => &self.derived_vm_numvcpus,
            RollupColumn::DerivedMemoryAvailable => &self.derived_memory_available,
            RollupColumn::DerivedMemoryUsed => &self.derived_memory_used,
            RollupColumn::DiskUsageRateAverage => &self.disk_usage_rate_average,
            RollupColumn::NetUsageRateAverage => &self.net_usage_rate_average,
            RollupColumn::DerivedVmUsedDiskStorage => &self.derived_vm_used_disk_storage,
            RollupColumn::DerivedVmAllocatedDiskStorage => &self.derived_vm_allocated_disk_storage,
            RollupColumn::DerivedCpuAvailable => &self.derived_cpu_available,
            RollupColumn::DerivedCpuReserved => &self.derived_cpu_reserved,
            RollupColumn::DerivedMemoryReserved => &self.derived_memory_reserved,
        }
    }

    fn slot_mut(&mut self, column: RollupColumn) -> &mut Option<f64> {
        match column {
            RollupColumn::CpuUsagemhzRateAverage => &mut self.cpu_usagemhz_rate_average,
            RollupColumn::CpuUsageRateAverage => &mut self.cpu_usage_rate_average,
            RollupColumn::DerivedVmNumvcpus => &mut self.derived_vm_numvcpus,
            RollupColumn::DerivedMemoryAvailable => &mut self.derived_memory_available,
            RollupColumn::DerivedMemoryUsed => &mut self.derived_memory_used,
            RollupColumn::DiskUsageRateAverage => &mut self.disk_usage_rate_average,
            RollupColumn::NetUsageRateAverage => &mut self.net_usage_rate_average,
            RollupColumn::DerivedVmUsedDiskStorage => &mut self.derived_vm_used_disk_storage,
            RollupColumn::DerivedVmAllocatedDiskStorage => &mut self.derived_vm_allocated_disk_storage,
            RollupColumn::DerivedCpuAvailable => &mut self.derived_cpu_available,
            RollupColumn::DerivedCpuReserved => &mut self.derived_cpu_reserved,
            RollupColumn::DerivedMemoryReserved => &mut self.derived_memory_reserved,
        }
    }
}

/// Hardware columns read from the resource rather than from the rollup row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceColumn {
    CpuTotalCores,
    RamSize,
    AllocatedDiskStorage,
}

impl ResourceColumn {
    pub fn from_code<S: AsRef<str>>(code: S) -> Option<Self> {
        match code.as_ref().to_lowercase().as_str() {
            "cpu_total_cores" => Some(Self::CpuTotalCores),
            "ram_size" => Some(Self::RamSize),
            "allocated_disk_storage" => Some(Self::AllocatedDiskStorage),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::CpuTotalCores => "cpu_total_cores",
            Self::RamSize => "ram_size",
            Self::AllocatedDiskStorage => "allocated_disk_storage",
        }
    }
}

/// A reference to a node of the resource topology (host, cluster, storage,
/// provider, tenant or the enterprise root).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TopologyRef {
    pub id: u64,
    pub name: String,
}

impl TopologyRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareEntity {
    pub cpu_total_cores: Option<f64>,
    /// Memory size in MB.
    pub ram_size: Option<f64>,
    /// Allocated disk in bytes.
    pub allocated_disk_storage: Option<f64>,
}

/// The billed resource (VM, volume, container project, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntity {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub tenant: Option<TopologyRef>,
    #[serde(default)]
    pub hardware: HardwareEntity,
}

impl ResourceEntity {
    pub fn column(&self, column: ResourceColumn) -> Option<f64> {
        match column {
            ResourceColumn::CpuTotalCores => self.hardware.cpu_total_cores,
            ResourceColumn::RamSize => self.hardware.ram_size,
            ResourceColumn::AllocatedDiskStorage => self.hardware.allocated_disk_storage,
        }
    }
}

/// One hourly (or coarser) measurement for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRollupEntity {
    pub timestamp: DateTime<Utc>,
    pub capture_interval: CaptureInterval,
    pub resource_id: u64,
    /// `None` when the resource was deleted after the metric was captured.
    pub resource: Option<ResourceEntity>,
    pub tags: Vec<Tag>,
    pub parent_host: Option<TopologyRef>,
    pub parent_cluster: Option<TopologyRef>,
    pub parent_storage: Option<TopologyRef>,
    pub parent_provider: Option<TopologyRef>,
    pub values: RollupValues,
}

impl MetricRollupEntity {
    pub fn tenant(&self) -> Option<&TopologyRef> {
        self.resource.as_ref().and_then(|r| r.tenant.as_ref())
    }

    /// Identity used in logs and error messages.
    pub fn resource_label(&self) -> String {
        match &self.resource {
            Some(resource) => format!("{} (id {})", resource.name, resource.id),
            None => format!("deleted resource (id {})", self.resource_id),
        }
    }
}
