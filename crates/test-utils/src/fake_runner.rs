use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use atimewatch::errors::Result;
use atimewatch::exec::{CommandRunner, CommandSpec, CommandStatus};
use atimewatch::fs::mock::MockFileSystem;

type Script = Box<dyn FnMut(&MockFileSystem) + Send>;

/// A fake command runner that:
/// - records which commands were "run"
/// - applies a closure to a `MockFileSystem` in place of the command
/// - reports a fixed exit status.
pub struct FakeRunner {
    fs: MockFileSystem,
    script: Script,
    status: CommandStatus,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    pub fn new(fs: &MockFileSystem, script: impl FnMut(&MockFileSystem) + Send + 'static) -> Self {
        Self {
            fs: fs.clone(),
            script: Box::new(script),
            status: CommandStatus::exited(0),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A runner whose command touches nothing.
    pub fn noop(fs: &MockFileSystem) -> Self {
        Self::new(fs, |_| {})
    }

    pub fn exiting_with(mut self, status: CommandStatus) -> Self {
        self.status = status;
        self
    }

    /// Commands run so far, in display form.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(
        &'a mut self,
        cmd: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandStatus>> + Send + 'a>> {
        {
            let mut guard = self.executed.lock().unwrap();
            guard.push(cmd.to_string());
        }
        (self.script)(&self.fs);
        let status = self.status;
        Box::pin(async move { Ok(status) })
    }
}
