use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::persistence::metrics::rollup::metric_rollup_api_repository_trait::RollupFilter;
use crate::domain::chargeback::model::{Grouping, Interval, RangeOptions, TopologyLevel};
use crate::errors::ChargebackError;

/// Chargeback report request, as read from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_range_shape"))]
pub struct ChargebackRunRequest {
    /// `daily`, `weekly` or `monthly`.
    #[validate(length(min = 1))]
    pub interval: String,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    /// Number of intervals in a relative range.
    #[validate(range(min = 1))]
    pub interval_count: Option<u32>,
    pub end_interval_offset: Option<u32>,

    /// `UTC` or `±HH:MM`; the configured timezone when absent.
    pub timezone: Option<String>,

    /// Tag category to group by, e.g. `department`.
    #[validate(length(min = 1))]
    pub group_by_tag: Option<String>,

    /// Topology level to group by when no tag category is given.
    pub group_by: Option<String>,

    #[serde(default)]
    pub filters: Vec<RollupFilter>,

    /// Report columns; derived from the default rates when absent.
    pub columns: Option<Vec<String>>,
}

fn validate_range_shape(req: &ChargebackRunRequest) -> Result<(), ValidationError> {
    let explicit = req.start_time.is_some() || req.end_time.is_some();
    if explicit && req.interval_count.is_some() {
        return Err(ValidationError::new("range_conflict")
            .with_message("use either start_time/end_time or interval_count".into()));
    }
    if req.group_by_tag.is_some() && req.group_by.is_some() {
        return Err(ValidationError::new("grouping_conflict")
            .with_message("use either group_by_tag or group_by".into()));
    }
    Ok(())
}

impl ChargebackRunRequest {
    pub fn range_options(&self) -> RangeOptions {
        RangeOptions {
            start_time: self.start_time,
            end_time: self.end_time,
            interval_count: self.interval_count,
            end_interval_offset: self.end_interval_offset,
        }
    }

    pub fn interval(&self) -> Result<Interval, ChargebackError> {
        Interval::from_code(&self.interval)
    }

    /// Tag category when given, otherwise the topology level (resource by default).
    pub fn grouping(&self) -> Result<Grouping, ChargebackError> {
        if let Some(category) = &self.group_by_tag {
            return Ok(Grouping::ByTagCategory(category.clone()));
        }

        match &self.group_by {
            None => Ok(Grouping::ByTopology(TopologyLevel::Resource)),
            Some(code) => TopologyLevel::from_code(code)
                .map(Grouping::ByTopology)
                .ok_or_else(|| ChargebackError::Validation(format!("unknown group_by level '{code}'"))),
        }
    }
}
