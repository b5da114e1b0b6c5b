use std::collections::HashMap;

use anyhow::Result;

use super::classification_entity::ClassificationEntity;

pub trait ClassificationApiRepository: Send + Sync {
    /// Entries of one category keyed by entry name (the tag value).
    fn by_type_and_name(&self, category: &str) -> Result<HashMap<String, ClassificationEntity>>;
}
