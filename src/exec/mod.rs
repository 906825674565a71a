// src/exec/mod.rs

//! Running the wrapped command.
//!
//! The driver only needs "run this and tell me how it ended", so the seam
//! is a single [`CommandRunner`] trait:
//!
//! - [`process`] holds `ProcessRunner`, the production implementation built
//!   on `tokio::process::Command`.
//! - Tests provide their own runner that mutates a mock filesystem instead
//!   of spawning anything.

pub mod process;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub use process::ProcessRunner;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// A command string handed to `<shell> <flags...> <script>`.
    Shell {
        shell: String,
        flags: Vec<String>,
        script: String,
    },
    /// An argument vector executed directly.
    Argv(Vec<String>),
}

impl CommandSpec {
    pub fn shell(script: impl Into<String>) -> Self {
        CommandSpec::Shell {
            shell: "/bin/sh".to_string(),
            flags: vec!["-c".to_string()],
            script: script.into(),
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandSpec::Shell {
                shell,
                flags,
                script,
            } => {
                let mut v = Vec::with_capacity(flags.len() + 2);
                v.push(shell.clone());
                v.extend(flags.iter().cloned());
                v.push(script.clone());
                v
            }
            CommandSpec::Argv(argv) => argv.clone(),
        }
    }
}

impl fmt::Display for CommandSpec {
    /// Quoting here is only for display; the output is not meant to be fed
    /// back to a shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self
            .argv()
            .into_iter()
            .map(|w| {
                if w.contains([' ', '\t']) {
                    format!("'{w}'")
                } else {
                    w
                }
            })
            .collect();
        f.write_str(&words.join(" "))
    }
}

/// How the wrapped command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, or `128 + signal` if the child was killed by a signal.
    pub code: i32,
    pub signal: Option<i32>,
}

impl CommandStatus {
    pub const SPAWN_FAILED: i32 = 127;

    pub fn exited(code: i32) -> Self {
        Self { code, signal: None }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: 128 + signal,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Trait abstracting how the wrapped command is executed.
pub trait CommandRunner: Send {
    /// Run `cmd` to completion. Non-zero exit is a normal `Ok` outcome; only
    /// failures of the runner itself are `Err`.
    fn run<'a>(
        &'a mut self,
        cmd: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandStatus>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_spec_builds_argv() {
        let spec = CommandSpec::shell("touch foo; echo x > foo");
        assert_eq!(
            spec.argv(),
            vec!["/bin/sh", "-c", "touch foo; echo x > foo"]
        );
        assert_eq!(spec.to_string(), "/bin/sh -c 'touch foo; echo x > foo'");
    }

    #[test]
    fn signal_status_maps_to_128_plus_signo() {
        let st = CommandStatus::signaled(2);
        assert_eq!(st.code, 130);
        assert!(!st.success());
    }
}
