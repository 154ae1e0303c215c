//! Configuration loading for the bridge runtime.
//!
//! Config files: `imbridge.toml`, `imbridge.yaml`, `imbridge.yml` or
//! `imbridge.json`, searched in `./` then the user config directory.
//!
//! `${ENV_VAR}` placeholders are substituted before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{BridgeConfig, HistoryConfig, IpcConfig, ReaderConfig, SnapshotConfig},
};
