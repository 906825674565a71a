// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Config file picked up from the current directory when `--config` is not
/// given. It is optional.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("atimewatch.toml")
}

/// Load `path` if given, else the default file if it exists, else defaults.
pub fn load_raw_or_default(path: Option<&Path>) -> Result<RawConfigFile> {
    match path {
        Some(p) => load_from_path(p),
        None => {
            let default = default_config_path();
            if default.is_file() {
                load_from_path(default)
            } else {
                Ok(RawConfigFile::default())
            }
        }
    }
}
