//! Chargeback domain types (interval, grouping, keys, rows, run options)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::persistence::info::rates::chargeback_rate_entity::ChargebackRateEntity;
use crate::core::persistence::metrics::rollup::metric_rollup_api_repository_trait::RollupFilter;
use crate::core::persistence::metrics::rollup::metric_rollup_entity::{Tag, TopologyRef};
use crate::errors::ChargebackError;

pub const TOTAL_COST_COLUMN: &str = "total_cost";
pub const EMPTY_TAG_NAME: &str = "<Empty>";
pub const NO_PARENT_NAME: &str = "<No parent>";

/// Reporting period a row covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub fn from_code<S: AsRef<str>>(code: S) -> Result<Self, ChargebackError> {
        match code.as_ref().trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(ChargebackError::UnsupportedInterval(other.to_string())),
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for Interval {
    type Err = ChargebackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// How the report range is chosen.
///
/// Either both `start_time` and `end_time`, or a relative range of
/// `interval_count` intervals ending `end_interval_offset` intervals ago.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeOptions {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub interval_count: Option<u32>,
    pub end_interval_offset: Option<u32>,
}

/// Half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyLevel {
    Resource,
    Host,
    Cluster,
    Storage,
    Provider,
    Tenant,
}

impl TopologyLevel {
    pub fn from_code<S: AsRef<str>>(code: S) -> Option<Self> {
        match code.as_ref().trim().to_lowercase().as_str() {
            "resource" | "vm" => Some(Self::Resource),
            "host" => Some(Self::Host),
            "cluster" => Some(Self::Cluster),
            "storage" => Some(Self::Storage),
            "provider" => Some(Self::Provider),
            "tenant" => Some(Self::Tenant),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Host => "host",
            Self::Cluster => "cluster",
            Self::Storage => "storage",
            Self::Provider => "provider",
            Self::Tenant => "tenant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// Group by the classification of the first tag in this category.
    ByTagCategory(String),
    ByTopology(TopologyLevel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopologyKey {
    pub level: TopologyLevel,
    /// `None` groups every sample without an object at this level.
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupDimension {
    Topology(TopologyKey),
    Classification(Option<u64>),
}

/// Identity of one output row: the period bucket (period start, UTC) and the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub bucket: DateTime<Utc>,
    pub dimension: GroupDimension,
}

/// Samples with equal tags and topology resolve to the same rates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateCacheKey {
    pub tags: Vec<Tag>,
    pub host: Option<u64>,
    pub cluster: Option<u64>,
    pub storage: Option<u64>,
    pub provider: Option<u64>,
    pub tenant: Option<u64>,
}

/// Accumulator for one group and period.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub display_range: String,
    pub interval_name: String,
    pub chargeback_rates: Vec<String>,
    pub tag_name: Option<String>,
    pub group_level: Option<TopologyLevel>,
    pub group_id: Option<u64>,
    pub group_name: Option<String>,
    pub fixed_compute_metric: u64,
    pub columns: BTreeMap<String, f64>,
}

impl AggregateRow {
    pub fn new(
        start_date: DateTime<FixedOffset>,
        end_date: DateTime<FixedOffset>,
        display_range: String,
        interval: Interval,
    ) -> Self {
        Self {
            start_date,
            end_date,
            display_range,
            interval_name: interval.as_code().to_string(),
            chargeback_rates: Vec::new(),
            tag_name: None,
            group_level: None,
            group_id: None,
            group_name: None,
            fixed_compute_metric: 0,
            columns: BTreeMap::new(),
        }
    }

    pub fn add_rate_description(&mut self, description: &str) {
        if !self.chargeback_rates.iter().any(|d| d == description) {
            self.chargeback_rates.push(description.to_string());
        }
    }

    pub fn add(&mut self, column: &str, value: f64) {
        *self.columns.entry(column.to_string()).or_insert(0.0) += value;
    }

    pub fn set(&mut self, column: &str, value: f64) {
        self.columns.insert(column.to_string(), value);
    }

    pub fn column(&self, column: &str) -> Option<f64> {
        self.columns.get(column).copied()
    }
}

/// A flushed report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargebackRecord {
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub display_range: String,
    pub interval_name: String,
    pub chargeback_rates: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_level: Option<TopologyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub fixed_compute_metric: u64,
    #[serde(flatten)]
    pub columns: BTreeMap<String, f64>,
}

impl From<AggregateRow> for ChargebackRecord {
    fn from(row: AggregateRow) -> Self {
        Self {
            start_date: row.start_date,
            end_date: row.end_date,
            display_range: row.display_range,
            interval_name: row.interval_name,
            chargeback_rates: row.chargeback_rates.join(", "),
            tag_name: row.tag_name,
            group_level: row.group_level,
            group_id: row.group_id,
            group_name: row.group_name,
            fixed_compute_metric: row.fixed_compute_metric,
            columns: row.columns,
        }
    }
}

/// Columns the report declares; computed columns outside it are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSchema {
    columns: BTreeSet<String>,
}

impl ReportSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Every metric and cost column the given rates can produce, plus `total_cost`.
    pub fn for_rates(rates: &[ChargebackRateEntity]) -> Self {
        let mut columns = BTreeSet::from([TOTAL_COST_COLUMN.to_string()]);
        for detail in rates.iter().flat_map(|r| r.details.iter()) {
            for prefix in [detail.rate_name.as_str(), detail.group.as_code()] {
                columns.insert(format!("{prefix}_metric"));
                columns.insert(format!("{prefix}_cost"));
            }
        }
        Self { columns }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

/// Everything a run needs besides the repositories.
#[derive(Debug, Clone)]
pub struct ChargebackRunOptions<Tz: TimeZone> {
    pub range: RangeOptions,
    pub interval: Interval,
    pub timezone: Tz,
    pub grouping: Grouping,
    pub filters: Vec<RollupFilter>,
    pub schema: ReportSchema,
    /// Root of the rate assignment hierarchy.
    pub enterprise: TopologyRef,
    /// Day windows fetched at once by the concurrent driver.
    pub fetch_concurrency: usize,
}
