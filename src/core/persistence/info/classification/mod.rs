pub mod classification_api_repository_trait;
pub mod classification_entity;
pub mod classification_fs_adapter;
pub mod classification_repository;
