// src/driver.rs

//! The watch driver: snapshot, run, snapshot, classify, report.
//!
//! [`WatchDriver::run`] walks `Idle -> PreSnapshot -> Running ->
//! PostSnapshot -> Reporting -> Done` without skipping a state. Once the
//! command has been started, the post snapshot and the report always
//! happen, and the command's own status is what the run returns.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::diff::{diff, ChangeSet};
use crate::errors::{AuditError, Result};
use crate::exec::{CommandRunner, CommandSpec, CommandStatus};
use crate::fs::FileSystem;
use crate::normalize::AtimeNormalizer;
use crate::probe::{probe_atime_updates, ProbeVerdict};
use crate::report::Reporter;
use crate::resolve::PathResolver;
use crate::snapshot::{capture_post, capture_pre, NormalizeStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    PreSnapshot,
    Running,
    PostSnapshot,
    Reporting,
    Done,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriverState::Idle => "idle",
            DriverState::PreSnapshot => "pre-snapshot",
            DriverState::Running => "running",
            DriverState::PostSnapshot => "post-snapshot",
            DriverState::Reporting => "reporting",
            DriverState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Directories to check for working atime updates before the pre snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProbePlan {
    pub dirs: Vec<PathBuf>,
    pub keep_going: bool,
}

/// Everything known about one finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Display form of the wrapped command.
    pub command: String,
    pub cwd: PathBuf,
    pub status: CommandStatus,
    pub changes: ChangeSet,
    /// Watched paths that existed before / after the command.
    pub pre_count: usize,
    pub post_count: usize,
    pub started_ns: u64,
    pub finished_ns: u64,
    pub normalize: NormalizeStats,
    /// Set when the post snapshot, the runner or the reporter failed; the
    /// change set may then be empty or partial.
    pub incomplete: bool,
}

impl RunReport {
    /// The wrapped command's status, which is also this process's exit code.
    pub fn exit_code(&self) -> i32 {
        self.status.code
    }
}

pub struct WatchDriver {
    fs: Arc<dyn FileSystem>,
    resolver: Box<dyn PathResolver>,
    normalizer: AtimeNormalizer,
    probe: Option<ProbePlan>,
    cwd: Option<PathBuf>,
    state: DriverState,
    history: Vec<DriverState>,
}

impl fmt::Debug for WatchDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchDriver")
            .field("resolver", &self.resolver)
            .field("normalizer", &self.normalizer)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl WatchDriver {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        resolver: Box<dyn PathResolver>,
        normalizer: AtimeNormalizer,
    ) -> Self {
        Self {
            fs,
            resolver,
            normalizer,
            probe: None,
            cwd: None,
            state: DriverState::Idle,
            history: vec![DriverState::Idle],
        }
    }

    pub fn with_probe(mut self, plan: ProbePlan) -> Self {
        self.probe = Some(plan);
        self
    }

    /// Override the directory recorded in the report (defaults to the
    /// process working directory).
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[DriverState] {
        &self.history
    }

    fn enter(&mut self, next: DriverState) {
        debug!(from = %self.state, to = %next, "driver state transition");
        self.state = next;
        self.history.push(next);
    }

    /// Run `cmd` once under observation and hand the result to `reporter`.
    ///
    /// Errors are only returned for problems found before the command is
    /// started (precondition failures, a broken resolver). After that point
    /// failures are logged and flagged on the report instead.
    pub async fn run(
        &mut self,
        runner: &mut dyn CommandRunner,
        cmd: &CommandSpec,
        reporter: &mut dyn Reporter,
    ) -> Result<RunReport> {
        if self.state != DriverState::Idle {
            return Err(AuditError::Other(anyhow!(
                "watch driver already used (state: {})",
                self.state
            )));
        }

        self.check_preconditions()?;

        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let started_ns = now_ns();
        let clock = Instant::now();

        self.enter(DriverState::PreSnapshot);
        let resolution = self.resolver.resolve(self.fs.as_ref())?;
        let (pre, normalize) = capture_pre(self.fs.as_ref(), &resolution, &self.normalizer)?;
        if normalize.failed > 0 {
            warn!(
                failed = normalize.failed,
                "some atimes could not be adjusted; reads of those paths may go unnoticed"
            );
        }

        self.enter(DriverState::Running);
        info!(command = %cmd, watched = pre.len(), "running command");
        let mut incomplete = false;
        let status = match runner.run(cmd).await {
            Ok(status) => status,
            Err(err) => {
                error!(error = %err, "command runner failed");
                incomplete = true;
                CommandStatus::exited(CommandStatus::SPAWN_FAILED)
            }
        };
        debug!(code = status.code, signal = ?status.signal, "command finished");

        self.enter(DriverState::PostSnapshot);
        let post = self
            .resolver
            .resolve(self.fs.as_ref())
            .and_then(|resolution| capture_post(self.fs.as_ref(), &resolution));
        let (changes, post_count) = match post {
            Ok(post) => (diff(&pre, &post), post.existing_count()),
            Err(err) => {
                error!(error = %err, "post-run snapshot failed; no changes reported");
                incomplete = true;
                (ChangeSet::default(), 0)
            }
        };

        let mut report = RunReport {
            command: cmd.to_string(),
            cwd,
            status,
            changes,
            pre_count: pre.existing_count(),
            post_count,
            started_ns,
            finished_ns: now_ns(),
            normalize,
            incomplete,
        };

        self.enter(DriverState::Reporting);
        if let Err(err) = reporter.report(&report) {
            error!(error = %err, "failed to write report");
            report.incomplete = true;
        }

        self.enter(DriverState::Done);
        info!(
            changes = report.changes.len(),
            exit_code = report.exit_code(),
            elapsed = ?clock.elapsed(),
            "run finished"
        );
        Ok(report)
    }

    fn check_preconditions(&self) -> Result<()> {
        let Some(plan) = &self.probe else {
            return Ok(());
        };
        for dir in &plan.dirs {
            let verdict =
                probe_atime_updates(self.fs.as_ref(), dir, self.normalizer.offset(), plan.keep_going)?;
            if verdict == ProbeVerdict::AtimeIgnored {
                debug!(dir = %dir.display(), "continuing without atime updates");
            }
        }
        Ok(())
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;

    use crate::diff::Change;
    use crate::fs::mock::{AtimePolicy, MockFileSystem};
    use crate::resolve::PatternResolver;
    use crate::types::{Classification, FileTimes, Timestamp};

    fn times(a: i64, m: i64) -> Option<FileTimes> {
        Some(FileTimes::new(Timestamp::new(a, 0), Timestamp::new(m, 0)))
    }

    /// A finished run with one change of every kind, for reporter tests.
    pub(crate) fn sample_report() -> RunReport {
        let changes = ChangeSet::from_changes(vec![
            Change {
                path: "old.o".into(),
                kind: Classification::Removed,
                pre: times(1, 2),
                post: None,
            },
            Change {
                path: "a.h".into(),
                kind: Classification::Accessed,
                pre: times(1, 2),
                post: times(30, 2),
            },
            Change {
                path: "a.o".into(),
                kind: Classification::Created,
                pre: None,
                post: times(20, 20),
            },
            Change {
                path: "log.txt".into(),
                kind: Classification::Modified,
                pre: times(1, 2),
                post: times(25, 25),
            },
        ]);
        RunReport {
            command: CommandSpec::shell("cc -c a.c").to_string(),
            cwd: PathBuf::from("/work"),
            status: CommandStatus::exited(2),
            changes,
            pre_count: 3,
            post_count: 3,
            started_ns: 1,
            finished_ns: 2,
            normalize: NormalizeStats::default(),
            incomplete: false,
        }
    }

    struct ScriptRunner<F> {
        fs: MockFileSystem,
        script: F,
        status: CommandStatus,
    }

    impl<F: FnMut(&MockFileSystem) + Send> CommandRunner for ScriptRunner<F> {
        fn run<'a>(
            &'a mut self,
            _cmd: &'a CommandSpec,
        ) -> Pin<Box<dyn Future<Output = Result<CommandStatus>> + Send + 'a>> {
            (self.script)(&self.fs);
            let status = self.status;
            Box::pin(async move { Ok(status) })
        }
    }

    #[derive(Default)]
    struct Collect {
        seen: Vec<(String, Classification)>,
    }

    impl Reporter for Collect {
        fn report(&mut self, run: &RunReport) -> Result<()> {
            self.seen = run
                .changes
                .iter()
                .map(|c| (c.path.clone(), c.kind))
                .collect();
            Ok(())
        }
    }

    fn driver(fs: &MockFileSystem, patterns: &[&str]) -> WatchDriver {
        let resolver = PatternResolver::new(patterns.iter().copied()).unwrap();
        WatchDriver::new(
            Arc::new(fs.clone()),
            Box::new(resolver),
            AtimeNormalizer::default(),
        )
        .with_cwd("/work")
    }

    #[tokio::test]
    async fn walks_every_state_in_order_even_on_failure() {
        let fs = MockFileSystem::new();
        fs.add_file("foo", b"x".to_vec());
        let mut d = driver(&fs, &["foo"]);
        let mut runner = ScriptRunner {
            fs: fs.clone(),
            script: |fs: &MockFileSystem| fs.append("foo", b"y"),
            status: CommandStatus::exited(2),
        };
        let mut rep = Collect::default();

        let report = d
            .run(&mut runner, &CommandSpec::shell("false"), &mut rep)
            .await
            .unwrap();

        assert_eq!(
            d.history(),
            &[
                DriverState::Idle,
                DriverState::PreSnapshot,
                DriverState::Running,
                DriverState::PostSnapshot,
                DriverState::Reporting,
                DriverState::Done,
            ]
        );
        assert_eq!(report.exit_code(), 2);
        assert_eq!(rep.seen, vec![("foo".to_string(), Classification::Modified)]);
    }

    #[tokio::test]
    async fn driver_runs_only_once() {
        let fs = MockFileSystem::new();
        let mut d = driver(&fs, &["foo"]);
        let mut runner = ScriptRunner {
            fs: fs.clone(),
            script: |_: &MockFileSystem| {},
            status: CommandStatus::exited(0),
        };
        let cmd = CommandSpec::shell("true");
        d.run(&mut runner, &cmd, &mut Collect::default()).await.unwrap();

        let err = d
            .run(&mut runner, &cmd, &mut Collect::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Other(_)));
    }

    #[tokio::test]
    async fn failed_probe_stops_before_snapshot() {
        let fs = MockFileSystem::new().with_policy(AtimePolicy::NoAtime);
        let mut d = driver(&fs, &["foo"]).with_probe(ProbePlan {
            dirs: vec![PathBuf::from(".")],
            keep_going: false,
        });
        let mut runner = ScriptRunner {
            fs: fs.clone(),
            script: |fs: &MockFileSystem| fs.add_file("foo", Vec::new()),
            status: CommandStatus::exited(0),
        };

        let err = d
            .run(&mut runner, &CommandSpec::shell("touch foo"), &mut Collect::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Precondition(_)));
        assert_eq!(d.state(), DriverState::Idle);
        assert!(!fs.exists("foo"));
    }
}
