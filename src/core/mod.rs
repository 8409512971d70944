pub mod config;
pub mod error;
pub mod shared_map;
pub mod types;
