pub mod inventory_entity;
pub mod inventory_fs_adapter;
