// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::RawConfigFile;
use crate::resolve::split_watch_list;
use crate::types::OutputFormat;

/// Command-line arguments for `atimewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "atimewatch",
    version,
    about = "Run a command and report which watched files it created, modified, read or removed.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ATIMEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Snapshot the watched paths, run a command, and classify what changed.
    Run(RunArgs),
    /// Print paths from a JSON report written by `run --format json`.
    Query(QueryArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Colon-separated list of glob patterns to watch.
    #[arg(short = 'w', long, value_name = "PATTERNS", env = "ATIMEWATCH_PATHS")]
    pub watch: Option<String>,

    /// Comma-separated directories to walk recursively. May be repeated.
    #[arg(short = 't', long, value_name = "DIRS")]
    pub tree: Vec<String>,

    /// Extra file or directory name globs to skip while walking trees.
    #[arg(short = 'x', long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Command string passed to the shell.
    #[arg(short = 'c', long = "command", value_name = "CMD", conflicts_with = "argv")]
    pub script: Option<String>,

    /// Shell used for `--command` (default `/bin/sh`).
    #[arg(long, value_name = "PATH")]
    pub shell: Option<String>,

    /// Space-separated flags passed to the shell before the command
    /// (default `-c`).
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub shell_flags: Option<String>,

    /// Write the report here instead of stderr (text) or stdout (deps, json).
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Make target for `deps` output (default: output path minus extension).
    #[arg(long, value_name = "NAME")]
    pub target: Option<String>,

    /// Check that atimes are updated before running.
    #[arg(long)]
    pub probe: bool,

    /// Only warn when the atime probe fails.
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// Seconds atime is pushed behind mtime before the run.
    #[arg(long, value_name = "SECS")]
    pub atime_offset: Option<u64>,

    /// Append cwd and command to each text line.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Path to a TOML config file.
    ///
    /// Default: `atimewatch.toml` in the current directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Command and arguments to run directly, after `--`.
    #[arg(last = true, value_name = "ARGV")]
    pub argv: Vec<String>,
}

impl RunArgs {
    /// Layer the flags that were given on top of a file configuration.
    ///
    /// Lists given on the command line are appended; scalars replace.
    pub fn apply_to(&self, raw: &mut RawConfigFile) {
        if let Some(watch) = &self.watch {
            raw.watch.patterns.extend(split_watch_list(watch, ':'));
        }
        for dirs in &self.tree {
            raw.watch
                .roots
                .extend(split_watch_list(dirs, ',').into_iter().map(PathBuf::from));
        }
        raw.watch.exclude.extend(self.exclude.iter().cloned());

        if let Some(shell) = &self.shell {
            raw.command.shell = shell.clone();
        }
        if let Some(flags) = &self.shell_flags {
            raw.command.shell_flags = flags.clone();
        }
        if let Some(format) = self.format {
            raw.output.format = format;
        }
        if self.output.is_some() {
            raw.output.path = self.output.clone();
        }
        if self.target.is_some() {
            raw.output.target = self.target.clone();
        }
        if let Some(secs) = self.atime_offset {
            raw.normalize.atime_offset_secs = secs;
        }
        raw.probe.enabled |= self.probe;
        raw.probe.keep_going |= self.keep_going;
        raw.output.verbose |= self.verbose;
    }
}

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    #[arg(long)]
    pub created: bool,

    #[arg(long)]
    pub modified: bool,

    #[arg(long)]
    pub accessed: bool,

    #[arg(long)]
    pub removed: bool,

    /// Every category. Also the default when no category is given.
    #[arg(long)]
    pub all: bool,

    /// Sort paths by name instead of by last access time.
    #[arg(long)]
    pub alpha_sort: bool,

    /// JSON report to read.
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
