use std::path::{Path, PathBuf};

use crate::core::persistence::info::info_fixed_fs_adapter_trait::InfoFixedFsAdapterTrait;
use crate::core::persistence::storage_path::info_chargeback_rates_path;

use super::chargeback_rate_entity::ChargebackRateCatalogEntity;

/// FS adapter for `chargeback_rates.json`.
pub struct ChargebackRateFsAdapter {
    base: PathBuf,
}

impl ChargebackRateFsAdapter {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
        }
    }
}

impl InfoFixedFsAdapterTrait<ChargebackRateCatalogEntity> for ChargebackRateFsAdapter {
    fn path(&self) -> PathBuf {
        info_chargeback_rates_path(&self.base)
    }
}
