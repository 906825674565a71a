// src/probe.rs

//! Verifying that a filesystem records atime updates at all.
//!
//! On a `noatime` mount every read is invisible and the whole technique
//! produces wrong answers, so this is checked with a throwaway file before
//! any real snapshot is taken.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{AuditError, Result};
use crate::fs::FileSystem;
use crate::types::{FileKind, FileTimes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    AtimeUpdated,
    /// atimes are not updated but `keep_going` allowed the run to continue.
    AtimeIgnored,
}

fn probe_file(dir: &Path) -> PathBuf {
    dir.join(format!(".atimewatch.{}.tmp", std::process::id()))
}

/// Write a probe file in `dir`, push its atime `offset` behind mtime, read
/// it back, and check that the read moved atime forward again.
///
/// The probe file is removed whatever the outcome.
pub fn probe_atime_updates(
    fs: &dyn FileSystem,
    dir: &Path,
    offset: Duration,
    keep_going: bool,
) -> Result<ProbeVerdict> {
    let path = probe_file(dir);
    let result = run_probe(fs, &path, offset);

    if let Err(err) = fs.remove_file(&path) {
        debug!(path = %path.display(), error = %err, "could not remove probe file");
    }

    let updated = result?;
    if updated {
        debug!(dir = %dir.display(), "atime updates confirmed");
        return Ok(ProbeVerdict::AtimeUpdated);
    }

    let msg = format!("atimes not updated in {}", dir.display());
    if keep_going {
        warn!("{msg}; read detection will not work");
        Ok(ProbeVerdict::AtimeIgnored)
    } else {
        Err(AuditError::Precondition(msg))
    }
}

/// Directories to probe for glob `patterns`: the existing directory that
/// holds each pattern's literal prefix, deduplicated.
pub fn pattern_probe_dirs<S: AsRef<str>>(fs: &dyn FileSystem, patterns: &[S]) -> Vec<PathBuf> {
    let dirs: BTreeSet<PathBuf> = patterns
        .iter()
        .map(|p| existing_ancestor(fs, literal_dir(p.as_ref())))
        .collect();
    dirs.into_iter().collect()
}

/// Parent directory of `pattern`, cut at the first component holding a
/// wildcard.
fn literal_dir(pattern: &str) -> PathBuf {
    let parent = Path::new(pattern).parent().unwrap_or(Path::new(""));
    let mut dir = PathBuf::new();
    for comp in parent.components() {
        if comp.as_os_str().to_string_lossy().contains(['*', '?', '[']) {
            break;
        }
        dir.push(comp);
    }
    dir
}

/// Nearest ancestor of `dir` (itself included) that is a directory now.
fn existing_ancestor(fs: &dyn FileSystem, mut dir: PathBuf) -> PathBuf {
    loop {
        if dir.as_os_str().is_empty() || dir == Path::new(".") {
            return PathBuf::from(".");
        }
        if matches!(fs.stat(&dir), Ok(stat) if stat.kind == FileKind::Dir) {
            return dir;
        }
        if !dir.pop() {
            return PathBuf::from(".");
        }
    }
}

fn run_probe(fs: &dyn FileSystem, path: &Path, offset: Duration) -> Result<bool> {
    fs.write(path, b"data\n").map_err(|e| {
        AuditError::Precondition(format!("cannot create probe file {}: {e}", path.display()))
    })?;

    let written = fs.stat(path)?.times;
    let atime = written.mtime.checked_sub(offset).ok_or_else(|| {
        AuditError::Precondition(format!("atime offset {offset:?} out of range"))
    })?;
    fs.set_times(path, FileTimes::new(atime, written.mtime))
        .map_err(|e| {
            AuditError::Precondition(format!("cannot set times on {}: {e}", path.display()))
        })?;

    fs.read(path)?;
    let after = fs.stat(path)?.times;
    Ok(after.atime >= after.mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::{AtimePolicy, MockFileSystem};
    use crate::normalize::DEFAULT_ATIME_OFFSET;

    #[test]
    fn relatime_mount_passes() {
        let fs = MockFileSystem::new();
        fs.add_dir("work");
        let verdict = probe_atime_updates(&fs, Path::new("work"), DEFAULT_ATIME_OFFSET, false)
            .unwrap();
        assert_eq!(verdict, ProbeVerdict::AtimeUpdated);
        assert!(!fs.exists(probe_file(Path::new("work"))));
    }

    #[test]
    fn noatime_mount_is_fatal() {
        let fs = MockFileSystem::new().with_policy(AtimePolicy::NoAtime);
        fs.add_dir("work");
        let err = probe_atime_updates(&fs, Path::new("work"), DEFAULT_ATIME_OFFSET, false)
            .unwrap_err();
        assert!(matches!(err, AuditError::Precondition(msg) if msg.contains("atimes not updated")));
        assert!(!fs.exists(probe_file(Path::new("work"))));
    }

    #[test]
    fn noatime_mount_with_keep_going_warns() {
        let fs = MockFileSystem::new().with_policy(AtimePolicy::NoAtime);
        fs.add_dir("work");
        let verdict = probe_atime_updates(&fs, Path::new("work"), DEFAULT_ATIME_OFFSET, true)
            .unwrap();
        assert_eq!(verdict, ProbeVerdict::AtimeIgnored);
    }

    #[test]
    fn pattern_dirs_follow_literal_prefixes() {
        let fs = MockFileSystem::new();
        fs.add_file("src/main.c", b"".to_vec());
        fs.add_dir("build");
        fs.add_dir("/mnt/other");

        let dirs = pattern_probe_dirs(
            &fs,
            &[
                "foo",
                "src/*.c",
                "src/main.h",
                "build/out/*.o",
                "a*/b.c",
                "/mnt/other/[ab]/*.x",
            ],
        );
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/mnt/other"),
                PathBuf::from("."),
                PathBuf::from("build"),
                PathBuf::from("src"),
            ]
        );
    }
}
