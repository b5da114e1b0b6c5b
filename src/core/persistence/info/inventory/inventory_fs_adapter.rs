use std::path::{Path, PathBuf};

use crate::core::persistence::info::info_fixed_fs_adapter_trait::InfoFixedFsAdapterTrait;
use crate::core::persistence::storage_path::info_inventory_path;

use super::inventory_entity::InventoryEntity;

/// FS adapter for `inventory.json`.
pub struct InventoryFsAdapter {
    base: PathBuf,
}

impl InventoryFsAdapter {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
        }
    }
}

impl InfoFixedFsAdapterTrait<InventoryEntity> for InventoryFsAdapter {
    fn path(&self) -> PathBuf {
        info_inventory_path(&self.base)
    }
}
