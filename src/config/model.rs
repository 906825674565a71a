// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::normalize::DEFAULT_ATIME_OFFSET;
use crate::types::OutputFormat;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// patterns = ["foo", "obj/*.o"]
/// roots = ["src"]
/// exclude = ["*.tmp"]
///
/// [normalize]
/// atime_offset_secs = 86400
///
/// [probe]
/// enabled = true
/// keep_going = false
///
/// [output]
/// format = "deps"
/// path = "build/foo.d"
/// target = "foo"
/// ```
///
/// Every section is optional; command-line flags are layered on top before
/// validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub normalize: NormalizeSection,

    #[serde(default)]
    pub probe: ProbeSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub command: CommandSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Shell glob patterns. A pattern that matches nothing is still tracked.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Directories walked recursively (regular files only, one filesystem).
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// Extra name globs pruned from tree walks, on top of `.git`, `.svn`
    /// and `*.swp`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[normalize]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeSection {
    /// How far behind mtime atime is pushed before the run.
    #[serde(default = "default_atime_offset_secs")]
    pub atime_offset_secs: u64,
}

fn default_atime_offset_secs() -> u64 {
    DEFAULT_ATIME_OFFSET.as_secs()
}

impl Default for NormalizeSection {
    fn default() -> Self {
        Self {
            atime_offset_secs: default_atime_offset_secs(),
        }
    }
}

impl NormalizeSection {
    pub fn offset(&self) -> Duration {
        Duration::from_secs(self.atime_offset_secs)
    }
}

/// `[probe]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSection {
    /// Verify atime updates with a throwaway file before snapshotting.
    #[serde(default)]
    pub enabled: bool,

    /// Only warn if the probe shows atimes are not updated.
    #[serde(default)]
    pub keep_going: bool,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default)]
    pub format: OutputFormat,

    /// Where to write. Text goes to stderr and the other formats to stdout
    /// when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Make target for `deps` output; defaults to `path` minus extension.
    #[serde(default)]
    pub target: Option<String>,

    /// Append cwd and command to each text line.
    #[serde(default)]
    pub verbose: bool,
}

/// `[command]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSection {
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Space-separated flags placed before the script.
    #[serde(default = "default_shell_flags")]
    pub shell_flags: String,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_shell_flags() -> String {
    "-c".to_string()
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_flags: default_shell_flags(),
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holding one means the patterns compile, the roots exist, and the output
/// settings are coherent.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub normalize: NormalizeSection,
    pub probe: ProbeSection,
    pub output: OutputSection,
    pub command: CommandSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            watch: raw.watch,
            normalize: raw.normalize,
            probe: raw.probe,
            output: raw.output,
            command: raw.command,
        }
    }

    /// Target name for `deps` output.
    pub fn deps_target(&self) -> Option<String> {
        self.output.target.clone().or_else(|| {
            self.output
                .path
                .as_ref()
                .map(|p| p.with_extension("").to_string_lossy().into_owned())
        })
    }
}
