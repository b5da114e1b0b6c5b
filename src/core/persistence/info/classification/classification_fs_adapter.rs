use std::path::{Path, PathBuf};

use crate::core::persistence::info::info_fixed_fs_adapter_trait::InfoFixedFsAdapterTrait;
use crate::core::persistence::storage_path::info_classifications_path;

use super::classification_entity::ClassificationCatalogEntity;

/// FS adapter for `classifications.json`.
pub struct ClassificationFsAdapter {
    base: PathBuf,
}

impl ClassificationFsAdapter {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
        }
    }
}

impl InfoFixedFsAdapterTrait<ClassificationCatalogEntity> for ClassificationFsAdapter {
    fn path(&self) -> PathBuf {
        info_classifications_path(&self.base)
    }
}
