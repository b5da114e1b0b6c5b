pub mod chargeable_metric;
pub mod metric_rollup_api_repository_trait;
pub mod metric_rollup_entity;
pub mod metric_rollup_fs_adapter;
pub mod metric_rollup_repository;
