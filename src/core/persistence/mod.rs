pub mod info;
pub mod metrics;
pub mod storage_path;
