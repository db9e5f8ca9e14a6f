pub mod config;
pub mod manager;

pub use config::{CORE_PROFILE_BASE, CacheConfig, MapperConfig, ValidationPolicy};
pub use manager::SchemaMapper;
