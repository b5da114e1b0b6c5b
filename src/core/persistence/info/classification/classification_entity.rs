use serde::{Deserialize, Serialize};

/// A tag entry under a classification category, e.g. `department/finance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationEntity {
    pub id: u64,
    pub category: String,
    pub name: String,
    pub description: String,
}

/// All classifications, stored at `data/info/classifications.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationCatalogEntity {
    #[serde(default)]
    pub entries: Vec<ClassificationEntity>,
}
