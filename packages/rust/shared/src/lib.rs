//! Shared types, error model, and configuration for ParcelMosaic.
//!
//! This crate is the foundation depended on by all other ParcelMosaic crates.
//! It provides:
//! - [`MosaicError`] — the unified error type
//! - Domain types ([`MapUnit`], [`RunId`])
//! - The deterministic naming conventions ([`naming`])
//! - Configuration ([`AppConfig`], [`ConversionSettings`], config loading)

pub mod config;
pub mod error;
pub mod naming;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConversionSettings, LedgerConfig, MosaicNames, RunDefaults, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{MosaicError, Result};
pub use types::{MapUnit, RunId};
