// src/normalize.rs

//! Pushing atime behind mtime before the wrapped command runs.
//!
//! Under `relatime` the kernel only refreshes atime on read when the current
//! atime is not newer than mtime/ctime, or is more than a day old. A file
//! that was read recently would therefore show no atime movement at all when
//! the wrapped command reads it again. Rewriting atime to `mtime - offset`
//! (which also bumps ctime) guarantees the next read is recorded.

use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::types::FileTimes;

/// Default distance between the normalized atime and mtime.
///
/// Linux also compares against ctime, so anything smaller than the relatime
/// window is not guaranteed to work there.
pub const DEFAULT_ATIME_OFFSET: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// atime was already at or before `mtime - offset`; nothing written.
    AlreadyBehind,
    Adjusted,
    /// The filesystem refused the update. Access detection for this path
    /// may be unreliable.
    Failed(io::ErrorKind),
}

#[derive(Debug, Clone, Copy)]
pub struct AtimeNormalizer {
    offset: Duration,
}

impl Default for AtimeNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ATIME_OFFSET)
    }
}

impl AtimeNormalizer {
    pub fn new(offset: Duration) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// The times `path` should have after normalization. mtime is never
    /// changed.
    pub fn target(&self, current: FileTimes) -> FileTimes {
        let atime = current
            .mtime
            .checked_sub(self.offset)
            .unwrap_or(current.atime.min(current.mtime));
        FileTimes::new(atime, current.mtime)
    }

    /// Normalize one existing path, returning the times that should be
    /// recorded for it together with what happened.
    pub fn normalize(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        current: FileTimes,
    ) -> (FileTimes, NormalizeOutcome) {
        let target = self.target(current);
        if current.atime <= target.atime {
            return (current, NormalizeOutcome::AlreadyBehind);
        }

        match fs.set_times(path, target) {
            Ok(()) => {
                debug!(path = %path.display(), atime = %target.atime, "atime pushed behind mtime");
                (target, NormalizeOutcome::Adjusted)
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "cannot adjust atime; read detection may be unreliable"
                );
                (current, NormalizeOutcome::Failed(err.kind()))
            }
        }
    }
}
