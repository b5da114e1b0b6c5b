use std::path::Path;

use anyhow::Result;
use tracing::{debug, error};

use crate::core::persistence::info::info_fixed_fs_adapter_trait::InfoFixedFsAdapterTrait;
use crate::core::persistence::metrics::rollup::metric_rollup_entity::ResourceEntity;

use super::chargeback_rate_api_repository_trait::ChargebackRateApiRepository;
use super::chargeback_rate_entity::{ChargebackRateCatalogEntity, ChargebackRateEntity, RateParent};
use super::chargeback_rate_fs_adapter::ChargebackRateFsAdapter;

/// Rate repository backed by the on-disk catalog, loaded once per instance.
pub struct ChargebackRateRepository {
    catalog: ChargebackRateCatalogEntity,
}

impl ChargebackRateRepository {
    pub fn new(base: &Path) -> Result<Self> {
        let adapter = ChargebackRateFsAdapter::new(base);
        let catalog = adapter.read().map_err(|err| {
            error!(error = %err, "Failed to read chargeback rate catalog");
            err
        })?;
        debug!(
            rates = catalog.rates.len(),
            assignments = catalog.assignments.len(),
            "Loaded chargeback rate catalog"
        );
        Ok(Self::from_catalog(catalog))
    }

    pub fn from_catalog(catalog: ChargebackRateCatalogEntity) -> Self {
        Self { catalog }
    }
}

impl ChargebackRateApiRepository for ChargebackRateRepository {
    fn assigned_rates(
        &self,
        resource: &ResourceEntity,
        tag_list: &[String],
        parents: &[RateParent],
    ) -> Result<Vec<ChargebackRateEntity>> {
        let rates = self.catalog.assigned_for_target(tag_list, parents);
        debug!(
            resource_id = resource.id,
            tags = tag_list.len(),
            parents = parents.len(),
            rates = rates.len(),
            "Resolved assigned rates"
        );
        Ok(rates)
    }

    fn default_rates(&self) -> Result<Vec<ChargebackRateEntity>> {
        Ok(self.catalog.default_rates())
    }
}
