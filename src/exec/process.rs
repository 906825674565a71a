// src/exec/process.rs

//! Production command runner.

use std::future::Future;
use std::pin::Pin;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::exec::{CommandRunner, CommandSpec, CommandStatus};

/// Spawns the command with inherited stdio and waits for it.
///
/// Ctrl-C reaches the child through the terminal's process group. This
/// runner swallows it and keeps waiting, so the post-run snapshot still
/// happens after an interrupted command exits.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run<'a>(
        &'a mut self,
        cmd: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandStatus>> + Send + 'a>> {
        Box::pin(async move { run_process(cmd).await })
    }
}

async fn run_process(spec: &CommandSpec) -> Result<CommandStatus> {
    let argv = spec.argv();
    let Some((program, args)) = argv.split_first() else {
        warn!("empty command; nothing to run");
        return Ok(CommandStatus::exited(0));
    };

    info!(cmd = %spec, "starting command");

    let mut child = match Command::new(program).args(args).spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(cmd = %spec, error = %err, "failed to spawn command");
            return Ok(CommandStatus::exited(CommandStatus::SPAWN_FAILED));
        }
    };

    let status = loop {
        tokio::select! {
            res = child.wait() => break res?,
            sig = tokio::signal::ctrl_c() => {
                match sig {
                    Ok(()) => info!("interrupt received; waiting for command to exit"),
                    Err(err) => {
                        debug!(error = %err, "cannot listen for interrupts");
                        break child.wait().await?;
                    }
                }
            }
        }
    };

    let status = to_command_status(status);
    info!(exit_code = status.code, signal = ?status.signal, "command exited");
    Ok(status)
}

#[cfg(unix)]
fn to_command_status(status: ExitStatus) -> CommandStatus {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => CommandStatus::exited(code),
        (None, Some(sig)) => CommandStatus::signaled(sig),
        (None, None) => CommandStatus::exited(1),
    }
}

#[cfg(not(unix))]
fn to_command_status(status: ExitStatus) -> CommandStatus {
    CommandStatus::exited(status.code().unwrap_or(1))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exit_status_is_passed_through() {
        let mut runner = ProcessRunner::new();
        let status = runner.run(&CommandSpec::shell("exit 2")).await.unwrap();
        assert_eq!(status, CommandStatus::exited(2));
    }

    #[tokio::test]
    async fn missing_program_reports_127() {
        let mut runner = ProcessRunner::new();
        let spec = CommandSpec::Argv(vec!["/nonexistent/atimewatch-test-bin".to_string()]);
        let status = runner.run(&spec).await.unwrap();
        assert_eq!(status.code, CommandStatus::SPAWN_FAILED);
    }
}
