#![allow(dead_code)]

use std::path::PathBuf;

use atimewatch::config::{ConfigFile, RawConfigFile};
use atimewatch::errors::Result;
use atimewatch::types::OutputFormat;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.config.watch.patterns.push(pattern.to_string());
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.watch.roots.push(root.into());
        self
    }

    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn with_atime_offset(mut self, secs: u64) -> Self {
        self.config.normalize.atime_offset_secs = secs;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.path = Some(path.into());
        self
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.config.output.target = Some(target.to_string());
        self
    }

    pub fn with_probe(mut self, keep_going: bool) -> Self {
        self.config.probe.enabled = true;
        self.config.probe.keep_going = keep_going;
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
