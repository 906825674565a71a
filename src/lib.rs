// src/lib.rs

pub mod cli;
pub mod config;
pub mod diff;
pub mod driver;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod normalize;
pub mod probe;
pub mod query;
pub mod report;
pub mod resolve;
pub mod snapshot;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::cli::{CliArgs, Command, QueryArgs, RunArgs};
use crate::config::{load_raw_or_default, ConfigFile};
use crate::driver::{ProbePlan, WatchDriver};
use crate::errors::AuditError;
use crate::exec::{CommandSpec, ProcessRunner};
use crate::fs::RealFileSystem;
use crate::normalize::AtimeNormalizer;
use crate::probe::pattern_probe_dirs;
use crate::query::QueryOrder;
use crate::resolve::{CompositeResolver, PatternResolver, TreeFilter, TreeResolver};
use crate::types::Classification;

/// High-level entry point used by `main.rs`.
///
/// Returns the exit code the process should end with: the wrapped
/// command's status for `run`, zero for `query`.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.command {
        Command::Run(run_args) => run_watch(run_args).await,
        Command::Query(query_args) => run_query(&query_args),
    }
}

async fn run_watch(args: RunArgs) -> Result<i32> {
    let mut raw = load_raw_or_default(args.config.as_deref())?;
    args.apply_to(&mut raw);
    let cfg = ConfigFile::try_from(raw)?;

    let cmd = command_spec(&args, &cfg)?;
    let resolver = build_resolver(&cfg)?;
    debug!(?resolver, command = %cmd, "configuration loaded");

    let mut driver = WatchDriver::new(
        Arc::new(RealFileSystem),
        Box::new(resolver),
        AtimeNormalizer::new(cfg.normalize.offset()),
    );
    if cfg.probe.enabled {
        driver = driver.with_probe(probe_plan(&cfg));
    }

    let mut reporter = report::reporter_for(&cfg)?;
    let mut runner = ProcessRunner::new();
    let report = driver.run(&mut runner, &cmd, reporter.as_mut()).await?;
    Ok(report.exit_code())
}

fn run_query(args: &QueryArgs) -> Result<i32> {
    let report = query::load_report(&args.report)?;

    let kinds: Vec<Classification> = if args.all {
        Classification::ALL.to_vec()
    } else {
        [
            (args.created, Classification::Created),
            (args.modified, Classification::Modified),
            (args.accessed, Classification::Accessed),
            (args.removed, Classification::Removed),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect()
    };
    let order = if args.alpha_sort {
        QueryOrder::Alphabetical
    } else {
        QueryOrder::ByAtime
    };

    for path in query::select(&report, &kinds, order) {
        println!("{path}");
    }
    Ok(0)
}

/// Turn the command-line command into something runnable.
fn command_spec(args: &RunArgs, cfg: &ConfigFile) -> Result<CommandSpec> {
    if !args.argv.is_empty() {
        return Ok(CommandSpec::Argv(args.argv.clone()));
    }
    match &args.script {
        Some(script) => Ok(CommandSpec::Shell {
            shell: cfg.command.shell.clone(),
            flags: cfg
                .command
                .shell_flags
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            script: script.clone(),
        }),
        None => Err(AuditError::ConfigError(
            "no command given: use --command CMD or -- ARGV...".to_string(),
        )
        .into()),
    }
}

/// Patterns and tree roots from the config, unioned.
///
/// The report file is excluded from tree walks so writing it does not show
/// up as a change of the next run.
fn build_resolver(cfg: &ConfigFile) -> Result<CompositeResolver> {
    let mut resolver = CompositeResolver::new();

    if !cfg.watch.patterns.is_empty() {
        resolver = resolver.with(PatternResolver::new(cfg.watch.patterns.iter().cloned())?);
    }

    if !cfg.watch.roots.is_empty() {
        let filter = TreeFilter::new(cfg.watch.exclude.iter().cloned())?;
        let mut tree = TreeResolver::new(cfg.watch.roots.clone(), filter);
        if let Some(path) = &cfg.output.path {
            tree = tree.excluding(path.clone());
        }
        resolver = resolver.with(tree);
    }

    Ok(resolver)
}

/// Probe every tree root and the directories holding the watched patterns.
fn probe_plan(cfg: &ConfigFile) -> ProbePlan {
    let mut dirs = cfg.watch.roots.clone();
    if !cfg.watch.patterns.is_empty() {
        for dir in pattern_probe_dirs(&RealFileSystem, &cfg.watch.patterns) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }
    ProbePlan {
        dirs,
        keep_going: cfg.probe.keep_going,
    }
}
