use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

use crate::core::persistence::storage_path::{
    metric_rollup_hour_dir_path, metric_rollup_hour_file_path,
};

use super::metric_rollup_entity::{CaptureInterval, RollupColumn, RollupValues, Tag};

/// Number of identity columns preceding the utilization columns.
const IDENTITY_COLUMNS: usize = 7;

/// A rollup row as stored on disk: topology by id only, tags as codes.
///
/// Line layout (pipe separated, no header):
/// `TIME|CAPTURE_INTERVAL|TAGS|PARENT_HOST|PARENT_CLUSTER|PARENT_STORAGE|PARENT_PROVIDER|<columns>`
/// where `TAGS` is a comma-joined list of `category/value` and `<columns>`
/// follow [`RollupColumn::ALL`]. Empty fields are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRollupRow {
    pub time: DateTime<Utc>,
    pub capture_interval: CaptureInterval,
    pub resource_id: u64,
    pub tags: Vec<Tag>,
    pub parent_host_id: Option<u64>,
    pub parent_cluster_id: Option<u64>,
    pub parent_storage_id: Option<u64>,
    pub parent_provider_id: Option<u64>,
    pub values: RollupValues,
}

/// Adapter for hourly rollup files, one directory per resource and one file
/// per month: `metric/rollup/hour/<resource_id>/<YYYY-MM>.rcd`.
#[derive(Debug, Clone)]
pub struct MetricRollupFsAdapter {
    base: PathBuf,
}

impl MetricRollupFsAdapter {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
        }
    }

    fn build_path_for(&self, resource_id: u64, date: NaiveDate) -> PathBuf {
        let month_str = date.format("%Y-%m").to_string();
        metric_rollup_hour_file_path(&self.base, resource_id, &month_str)
    }

    fn opt<T: ToString>(v: Option<T>) -> String {
        v.map(|x| x.to_string()).unwrap_or_default()
    }

    fn parse_line(resource_id: u64, line: &str) -> Option<MetricRollupRow> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != IDENTITY_COLUMNS + RollupColumn::ALL.len() {
            return None;
        }

        let time = parts[0].parse::<DateTime<Utc>>().ok()?;
        let capture_interval = CaptureInterval::from_code(parts[1])?;
        let tags = parts[2].split(',').filter_map(Tag::parse).collect();

        let mut values = RollupValues::default();
        for (idx, column) in RollupColumn::ALL.iter().enumerate() {
            values.set(*column, parts[IDENTITY_COLUMNS + idx].parse().ok());
        }

        Some(MetricRollupRow {
            time,
            capture_interval,
            resource_id,
            tags,
            parent_host_id: parts[3].parse().ok(),
            parent_cluster_id: parts[4].parse().ok(),
            parent_storage_id: parts[5].parse().ok(),
            parent_provider_id: parts[6].parse().ok(),
            values,
        })
    }

    fn format_row(row: &MetricRollupRow) -> String {
        let tags: Vec<String> = row.tags.iter().map(Tag::as_code).collect();
        let mut fields = vec![
            row.time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            row.capture_interval.as_code().to_string(),
            tags.join(","),
            Self::opt(row.parent_host_id),
            Self::opt(row.parent_cluster_id),
            Self::opt(row.parent_storage_id),
            Self::opt(row.parent_provider_id),
        ];
        fields.extend(RollupColumn::ALL.iter().map(|c| Self::opt(row.values.get(*c))));

        let mut line = fields.join("|");
        line.push('\n');
        line
    }

    /// Appends a row to the file of the row's own month.
    pub fn append_row(&self, row: &MetricRollupRow) -> Result<()> {
        let path = self.build_path_for(row.resource_id, row.time.date_naive());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(Self::format_row(row).as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Resource ids that have a rollup directory.
    pub fn resource_ids(&self) -> Result<Vec<u64>> {
        let dir = metric_rollup_hour_dir_path(&self.base);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().to_string_lossy().parse::<u64>() {
                Ok(id) => ids.push(id),
                Err(_) => {
                    tracing::warn!("Skipping unexpected rollup directory {:?}", entry.path());
                }
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    /// Rows of one resource with `start <= time < end`, in time order.
    pub fn get_row_between(
        &self,
        resource_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricRollupRow>> {
        let mut data = Vec::new();
        if start >= end {
            return Ok(data);
        }

        let mut current = NaiveDate::from_ymd_opt(start.year(), start.month(), 1)
            .ok_or_else(|| anyhow!("Invalid start month {}-{}", start.year(), start.month()))?;
        let last = NaiveDate::from_ymd_opt(end.year(), end.month(), 1)
            .ok_or_else(|| anyhow!("Invalid end month {}-{}", end.year(), end.month()))?;

        while current <= last {
            let path = self.build_path_for(resource_id, current);

            if path.exists() {
                match File::open(&path) {
                    Ok(file) => {
                        for line in BufReader::new(file).lines() {
                            let line = line?;
                            match Self::parse_line(resource_id, &line) {
                                Some(row) if row.time >= start && row.time < end => data.push(row),
                                Some(_) => {}
                                None if line.trim().is_empty() => {}
                                None => tracing::warn!(
                                    resource_id,
                                    "Skipping malformed rollup line in {:?}",
                                    path
                                ),
                            }
                        }
                    }
                    Err(e) => tracing::warn!("Could not open {:?}: {}", path, e),
                }
            } else {
                tracing::debug!(
                    "Rollup file missing for {} at month {}",
                    resource_id,
                    current.format("%Y-%m")
                );
            }

            current = current
                .checked_add_months(Months::new(1))
                .ok_or_else(|| anyhow!("Month overflow after {}", current))?;
        }

        data.sort_by_key(|r| r.time);
        Ok(data)
    }
}
