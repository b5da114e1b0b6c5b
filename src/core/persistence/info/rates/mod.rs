pub mod chargeback_rate_api_repository_trait;
pub mod chargeback_rate_entity;
pub mod chargeback_rate_fs_adapter;
pub mod chargeback_rate_repository;
