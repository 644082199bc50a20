//! Infrastructure layer for Halibot.
//!
//! Contains implementations of the ports defined in `halibot-core`: the JSON
//! file permission store, plus the `config.toml` loader and data directory
//! resolution.

pub mod config;
pub mod permission_store;

pub use config::{load_runtime_config, resolve_data_dir};
pub use permission_store::JsonFilePermissionStore;
