pub mod classification;
pub mod info_fixed_fs_adapter_trait;
pub mod inventory;
pub mod rates;
