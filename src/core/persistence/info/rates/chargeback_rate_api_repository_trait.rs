use anyhow::Result;

use crate::core::persistence::metrics::rollup::metric_rollup_entity::ResourceEntity;

use super::chargeback_rate_entity::{ChargebackRateEntity, RateParent};

/// Read-only access to rate definitions and their assignments.
pub trait ChargebackRateApiRepository: Send + Sync {
    /// Rates applicable to `resource` given its managed tag references and
    /// its ancestors, nearest first.
    fn assigned_rates(
        &self,
        resource: &ResourceEntity,
        tag_list: &[String],
        parents: &[RateParent],
    ) -> Result<Vec<ChargebackRateEntity>>;

    /// Rates flagged as default; used up front to decide which rollup columns
    /// a run needs.
    fn default_rates(&self) -> Result<Vec<ChargebackRateEntity>>;
}
