// src/config/mod.rs

//! Configuration loading and validation for atimewatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a `ConfigFile` (`validate.rs`): patterns compile,
//!   roots exist, output settings are coherent.
//!
//! Command-line flags are applied to the `RawConfigFile` before validation,
//! so both sources go through the same checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_raw_or_default};
pub use model::{
    CommandSection, ConfigFile, NormalizeSection, OutputSection, ProbeSection, RawConfigFile,
    WatchSection,
};
