use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

/// File-backed storage for a single info document (inventory, rate catalog,
/// classifications). A missing file reads as the entity's default.
pub trait InfoFixedFsAdapterTrait<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Default,
{
    fn path(&self) -> PathBuf;

    fn read(&self) -> Result<T> {
        let path = self.path();
        if !path.exists() {
            return Ok(T::default());
        }
        read_json(&path)
    }

    fn update(&self, data: &T) -> Result<()> {
        write_json_atomic(&self.path(), data)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes to a sibling temp file then renames over the target.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;
    }

    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
