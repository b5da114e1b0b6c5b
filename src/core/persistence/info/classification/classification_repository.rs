use std::collections::HashMap;

use anyhow::Result;
use tracing::error;

use crate::core::persistence::info::info_fixed_fs_adapter_trait::InfoFixedFsAdapterTrait;

use super::classification_api_repository_trait::ClassificationApiRepository;
use super::classification_entity::ClassificationEntity;
use super::classification_fs_adapter::ClassificationFsAdapter;

pub struct ClassificationRepository {
    adapter: ClassificationFsAdapter,
}

impl ClassificationRepository {
    pub fn new(adapter: ClassificationFsAdapter) -> Self {
        Self { adapter }
    }
}

impl ClassificationApiRepository for ClassificationRepository {
    fn by_type_and_name(&self, category: &str) -> Result<HashMap<String, ClassificationEntity>> {
        let catalog = self.adapter.read().map_err(|err| {
            error!(error = %err, category, "Failed to read classifications");
            err
        })?;

        Ok(catalog
            .entries
            .into_iter()
            .filter(|e| e.category == category)
            .map(|e| (e.name.clone(), e))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::info::classification::classification_entity::ClassificationCatalogEntity;

    #[test]
    fn indexes_entries_of_one_category_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ClassificationFsAdapter::new(dir.path());
        adapter
            .update(&ClassificationCatalogEntity {
                entries: vec![
                    ClassificationEntity {
                        id: 11,
                        category: "department".into(),
                        name: "finance".into(),
                        description: "Finance".into(),
                    },
                    ClassificationEntity {
                        id: 12,
                        category: "environment".into(),
                        name: "prod".into(),
                        description: "Production".into(),
                    },
                ],
            })
            .unwrap();

        let repo = ClassificationRepository::new(ClassificationFsAdapter::new(dir.path()));
        let table = repo.by_type_and_name("department").unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("finance").map(|c| c.id), Some(11));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ClassificationRepository::new(ClassificationFsAdapter::new(dir.path()));
        assert!(repo.by_type_and_name("department").unwrap().is_empty());
    }
}
