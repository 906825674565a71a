use std::sync::{Arc, Mutex};

use atimewatch::driver::RunReport;
use atimewatch::errors::Result;
use atimewatch::report::Reporter;
use atimewatch::types::Classification;

/// Reporter that keeps every `(path, classification)` it is handed.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    seen: Arc<Mutex<Vec<(String, Classification)>>>,
    calls: Arc<Mutex<usize>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<(String, Classification)> {
        self.seen.lock().unwrap().clone()
    }

    /// How many times the driver reported.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, run: &RunReport) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        let mut guard = self.seen.lock().unwrap();
        guard.extend(run.changes.iter().map(|c| (c.path.clone(), c.kind)));
        Ok(())
    }
}
