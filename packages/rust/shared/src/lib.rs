//! Shared types, error model, and configuration for globdef.
//!
//! This crate is the foundation depended on by all other globdef crates.
//! It provides:
//! - [`GlobdefError`]: the unified error type
//! - Domain types ([`Bundle`])
//! - Configuration ([`AppConfig`], [`RemoteEnhancerConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DataConfig, RemoteConfig, RemoteEnhancerConfig, SchedulerSection, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{GlobdefError, Result};
pub use types::{
    Bundle, DEFAULT_SIDECAR_SUFFIX, SIDECAR_TEMP_SUFFIX, sidecar_path_for, temp_path_for,
};
