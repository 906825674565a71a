// src/fs/mod.rs

//! Filesystem access used by the snapshot engine.
//!
//! Everything that touches the disk goes through [`FileSystem`] so the
//! resolver, normalizer and driver can be exercised against the in-memory
//! [`mock::MockFileSystem`] in tests.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use glob::MatchOptions;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{AuditError, Result};
use crate::resolve::TreeFilter;
use crate::types::{FileKind, FileStat, FileTimes, Timestamp};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Stat `path`, following symlinks.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Set both atime and mtime of `path` with full precision.
    fn set_times(&self, path: &Path, times: FileTimes) -> io::Result<()>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Expand a shell glob. Zero matches is an empty list, not an error;
    /// only a malformed pattern fails.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Recursively list regular files under `root`, staying on the root's
    /// filesystem and pruning anything `filter` rejects.
    fn walk_files(&self, root: &Path, filter: &TreeFilter) -> Result<Vec<PathBuf>>;
}

/// Shell-like matching: wildcards never cross `/` and never match a
/// leading dot.
pub(crate) const SHELL_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Implementation that uses `std::fs`, `filetime`, `glob` and `walkdir`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        let kind = if meta.is_file() {
            FileKind::File
        } else if meta.is_dir() {
            FileKind::Dir
        } else {
            FileKind::Other
        };
        Ok(FileStat {
            times: FileTimes::new(
                from_file_time(FileTime::from_last_access_time(&meta)),
                from_file_time(FileTime::from_last_modification_time(&meta)),
            ),
            kind,
            len: meta.len(),
        })
    }

    fn set_times(&self, path: &Path, times: FileTimes) -> io::Result<()> {
        filetime::set_file_times(path, to_file_time(times.atime), to_file_time(times.mtime))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let paths = glob::glob_with(pattern, SHELL_MATCH).map_err(|e| {
            AuditError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut found = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) => found.push(path),
                // Unreadable directory somewhere along the pattern.
                Err(err) => debug!(pattern, error = %err, "skipping unreadable glob entry"),
            }
        }
        Ok(found)
    }

    fn walk_files(&self, root: &Path, filter: &TreeFilter) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .same_file_system(true)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                filter.allows_dir(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    warn!(root = %root.display(), error = %err, "cannot walk tree root");
                    return Ok(Vec::new());
                }
                // The wrapped command may be deleting things while we walk.
                Err(err) => {
                    debug!(root = %root.display(), error = %err, "skipping entry during walk");
                    continue;
                }
            };

            if entry.file_type().is_file()
                && filter.allows_file(&entry.file_name().to_string_lossy())
            {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

pub(crate) fn from_file_time(ft: FileTime) -> Timestamp {
    Timestamp::new(ft.unix_seconds(), ft.nanoseconds())
}

pub(crate) fn to_file_time(ts: Timestamp) -> FileTime {
    FileTime::from_unix_time(ts.secs, ts.nanos)
}

/// Render a path as the string key used by snapshots.
///
/// A leading `./` is dropped so that `.` as a tree root and a bare relative
/// pattern produce the same identity for the same file.
pub fn path_key(path: &Path) -> String {
    let s = path.to_string_lossy();
    match s.strip_prefix("./") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => s.into_owned(),
    }
}
