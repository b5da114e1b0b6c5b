//! On-disk layout of the chargeback data directory.
//!
//! ```text
//! <data>/metric/rollup/hour/<resource_id>/<YYYY-MM>.rcd
//! <data>/info/inventory.json
//! <data>/info/chargeback_rates.json
//! <data>/info/classifications.json
//! ```

use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";

pub fn metric_rollup_hour_dir_path(base: &Path) -> PathBuf {
    base.join("metric").join("rollup").join("hour")
}

pub fn metric_rollup_hour_key_dir_path(base: &Path, resource_id: u64) -> PathBuf {
    metric_rollup_hour_dir_path(base).join(resource_id.to_string())
}

pub fn metric_rollup_hour_file_path(base: &Path, resource_id: u64, month: &str) -> PathBuf {
    metric_rollup_hour_key_dir_path(base, resource_id).join(format!("{month}.rcd"))
}

pub fn info_dir_path(base: &Path) -> PathBuf {
    base.join("info")
}

pub fn info_inventory_path(base: &Path) -> PathBuf {
    info_dir_path(base).join("inventory.json")
}

pub fn info_chargeback_rates_path(base: &Path) -> PathBuf {
    info_dir_path(base).join("chargeback_rates.json")
}

pub fn info_classifications_path(base: &Path) -> PathBuf {
    info_dir_path(base).join("classifications.json")
}
