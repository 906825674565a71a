// src/snapshot.rs

//! Per-generation snapshot store.
//!
//! A [`Snapshot`] is built once per generation and never mutated afterwards;
//! the pre and post snapshots are independent and only joined by path key in
//! [`crate::diff`].

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use serde::Serialize;
use tracing::debug;

use crate::errors::{AuditError, Result};
use crate::fs::FileSystem;
use crate::normalize::{AtimeNormalizer, NormalizeOutcome};
use crate::resolve::{Resolution, ResolvedPath};
use crate::types::{FileTimes, Generation};

/// State of one watched path in one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEntry {
    pub path: String,
    /// `None` when the path did not exist at snapshot time.
    pub times: Option<FileTimes>,
    pub size: Option<u64>,
}

impl WatchEntry {
    pub fn present(path: impl Into<String>, times: FileTimes, size: u64) -> Self {
        Self {
            path: path.into(),
            times: Some(times),
            size: Some(size),
        }
    }

    pub fn absent(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            times: None,
            size: None,
        }
    }

    pub fn existed(&self) -> bool {
        self.times.is_some()
    }
}

/// Ordered map from path key to entry for a single generation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: Generation,
    entries: BTreeMap<String, WatchEntry>,
    /// Paths that could not be examined; excluded from classification.
    skipped: BTreeSet<String>,
}

impl Snapshot {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            entries: BTreeMap::new(),
            skipped: BTreeSet::new(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Insert an entry. A repeated key within one generation means the
    /// resolver broke its uniqueness guarantee.
    pub fn insert(&mut self, entry: WatchEntry) -> Result<()> {
        if self.entries.contains_key(&entry.path) || self.skipped.contains(&entry.path) {
            return Err(AuditError::DuplicatePath(format!(
                "{} ({} generation)",
                entry.path, self.generation
            )));
        }
        self.entries.insert(entry.path.clone(), entry);
        Ok(())
    }

    pub fn mark_skipped(&mut self, key: impl Into<String>) {
        self.skipped.insert(key.into());
    }

    pub fn get(&self, key: &str) -> Option<&WatchEntry> {
        self.entries.get(key)
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.skipped.contains(key)
    }

    /// All entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.skipped.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries whose path existed at snapshot time.
    pub fn existing_count(&self) -> usize {
        self.entries.values().filter(|e| e.existed()).count()
    }
}

/// Tally of what happened while normalizing the pre snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub adjusted: usize,
    pub already_behind: usize,
    pub failed: usize,
}

enum Probe {
    Present(FileTimes, u64),
    Absent,
    Skip,
}

fn probe(fs: &dyn FileSystem, rp: &ResolvedPath, generation: Generation) -> Probe {
    if rp.origin.is_placeholder() {
        return Probe::Absent;
    }
    match fs.stat(&rp.path) {
        Ok(stat) => Probe::Present(stat.times, stat.len),
        // Vanished between resolution and stat.
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %rp.key, %generation, "path vanished before stat");
            Probe::Absent
        }
        Err(err) => {
            debug!(path = %rp.key, %generation, error = %err, "cannot stat path; no longer tracked");
            Probe::Skip
        }
    }
}

/// Capture the pre-run generation, normalizing atimes of existing paths.
pub fn capture_pre(
    fs: &dyn FileSystem,
    resolution: &Resolution,
    normalizer: &AtimeNormalizer,
) -> Result<(Snapshot, NormalizeStats)> {
    let mut snapshot = Snapshot::new(Generation::Pre);
    let mut stats = NormalizeStats::default();

    for rp in resolution.iter() {
        match probe(fs, rp, Generation::Pre) {
            Probe::Present(times, size) => {
                let (recorded, outcome) = normalizer.normalize(fs, &rp.path, times);
                match outcome {
                    NormalizeOutcome::Adjusted => stats.adjusted += 1,
                    NormalizeOutcome::AlreadyBehind => stats.already_behind += 1,
                    // Removed between stat and set_times; the stat result is stale.
                    NormalizeOutcome::Failed(io::ErrorKind::NotFound) => {
                        debug!(path = %rp.key, "path vanished during normalization");
                        stats.failed += 1;
                        snapshot.insert(WatchEntry::absent(rp.key.clone()))?;
                        continue;
                    }
                    NormalizeOutcome::Failed(_) => stats.failed += 1,
                }
                snapshot.insert(WatchEntry::present(rp.key.clone(), recorded, size))?;
            }
            Probe::Absent => snapshot.insert(WatchEntry::absent(rp.key.clone()))?,
            Probe::Skip => snapshot.mark_skipped(rp.key.clone()),
        }
    }

    debug!(
        entries = snapshot.len(),
        existing = snapshot.existing_count(),
        adjusted = stats.adjusted,
        failed = stats.failed,
        "pre snapshot captured"
    );
    Ok((snapshot, stats))
}

/// Capture the post-run generation. Nothing is written to the filesystem.
pub fn capture_post(fs: &dyn FileSystem, resolution: &Resolution) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new(Generation::Post);

    for rp in resolution.iter() {
        match probe(fs, rp, Generation::Post) {
            Probe::Present(times, size) => {
                snapshot.insert(WatchEntry::present(rp.key.clone(), times, size))?
            }
            Probe::Absent => snapshot.insert(WatchEntry::absent(rp.key.clone()))?,
            Probe::Skip => snapshot.mark_skipped(rp.key.clone()),
        }
    }

    debug!(
        entries = snapshot.len(),
        existing = snapshot.existing_count(),
        "post snapshot captured"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::fs::mock::MockFileSystem;
    use crate::resolve::{PathResolver, PatternResolver, TreeFilter};
    use crate::types::{FileStat, Timestamp};

    #[test]
    fn duplicate_insert_is_an_invariant_violation() {
        let mut snap = Snapshot::new(Generation::Pre);
        snap.insert(WatchEntry::absent("foo")).unwrap();
        let err = snap.insert(WatchEntry::absent("foo")).unwrap_err();
        assert!(matches!(err, AuditError::DuplicatePath(msg) if msg.contains("foo")));
    }

    #[test]
    fn iteration_is_sorted_by_path() {
        let mut snap = Snapshot::new(Generation::Post);
        let t = FileTimes::new(Timestamp::new(1, 0), Timestamp::new(2, 0));
        snap.insert(WatchEntry::present("b", t, 0)).unwrap();
        snap.insert(WatchEntry::present("a/z", t, 0)).unwrap();
        snap.insert(WatchEntry::absent("a")).unwrap();

        let keys: Vec<&str> = snap.keys().collect();
        assert_eq!(keys, vec!["a", "a/z", "b"]);
        assert_eq!(snap.existing_count(), 2);
    }

    #[test]
    fn pre_capture_normalizes_and_records_placeholders() {
        let fs = MockFileSystem::new();
        fs.add_file("foo", b"x".to_vec());
        let resolution = PatternResolver::new(["foo", "bar"])
            .unwrap()
            .resolve(&fs)
            .unwrap();

        let (snap, stats) =
            capture_pre(&fs, &resolution, &AtimeNormalizer::default()).unwrap();

        assert_eq!(stats.adjusted, 1);
        assert!(!snap.get("bar").unwrap().existed());
        let foo = snap.get("foo").unwrap().times.unwrap();
        assert!(foo.atime < foo.mtime);
        assert_eq!(fs.times_of("foo").unwrap(), foo);
    }

    #[test]
    fn unstatable_path_is_skipped_not_fatal() {
        let fs = MockFileSystem::new();
        fs.add_file("secret", b"x".to_vec());
        fs.set_unstatable("secret");
        let resolution = PatternResolver::new(["secret"]).unwrap().resolve(&fs).unwrap();

        let snap = capture_post(&fs, &resolution).unwrap();
        assert!(snap.is_empty());
        assert!(snap.is_skipped("secret"));
        assert_eq!(snap.skipped().collect::<Vec<_>>(), vec!["secret"]);
        assert_eq!(snap.generation(), Generation::Post);
    }

    /// Deletes the file inside `set_times`, as if another process removed
    /// it right after it was stat'ed.
    #[derive(Debug)]
    struct VanishingFs(MockFileSystem);

    impl FileSystem for VanishingFs {
        fn stat(&self, path: &Path) -> io::Result<FileStat> {
            self.0.stat(path)
        }
        fn set_times(&self, path: &Path, _times: FileTimes) -> io::Result<()> {
            self.0.remove_file(path)?;
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.0.read(path)
        }
        fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            self.0.write(path, contents)
        }
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.0.remove_file(path)
        }
        fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
            self.0.glob(pattern)
        }
        fn walk_files(&self, root: &Path, filter: &TreeFilter) -> Result<Vec<PathBuf>> {
            self.0.walk_files(root, filter)
        }
    }

    #[test]
    fn path_vanishing_during_normalization_is_recorded_absent() {
        let mock = MockFileSystem::new();
        mock.add_file("foo", b"x".to_vec());
        let fs = VanishingFs(mock.clone());
        let resolution = PatternResolver::new(["foo"]).unwrap().resolve(&fs).unwrap();

        let (pre, stats) = capture_pre(&fs, &resolution, &AtimeNormalizer::default()).unwrap();
        assert_eq!(stats.failed, 1);
        assert!(!pre.get("foo").unwrap().existed());
        assert!(!mock.exists("foo"));

        let post_resolution = PatternResolver::new(["foo"]).unwrap().resolve(&fs).unwrap();
        let post = capture_post(&fs, &post_resolution).unwrap();
        assert!(crate::diff::diff(&pre, &post).is_empty());
    }
}
