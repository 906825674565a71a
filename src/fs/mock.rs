// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use globset::GlobBuilder;

use super::FileSystem;
use crate::errors::{AuditError, Result};
use crate::resolve::TreeFilter;
use crate::types::{FileKind, FileStat, FileTimes, Timestamp};

/// How reads update atime, mirroring the Linux mount options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtimePolicy {
    /// Every read sets atime to now.
    Strict,
    /// Update only if atime <= mtime, atime <= ctime, or atime is a day old.
    #[default]
    Relatime,
    /// Reads never touch atime.
    NoAtime,
}

const RELATIME_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
const TICK: Duration = Duration::from_micros(1);

#[derive(Debug, Clone)]
struct MockNode {
    kind: FileKind,
    contents: Vec<u8>,
    atime: Timestamp,
    mtime: Timestamp,
    ctime: Timestamp,
}

#[derive(Debug)]
struct MockState {
    nodes: BTreeMap<PathBuf, MockNode>,
    now: Timestamp,
    policy: AtimePolicy,
    coarse: bool,
    read_only: BTreeSet<PathBuf>,
    unstatable: BTreeSet<PathBuf>,
}

impl MockState {
    /// Advance the clock by one tick and return the (possibly truncated) time.
    fn tick(&mut self) -> Timestamp {
        self.now = Timestamp::from_nanos(self.now.as_nanos() + TICK.as_nanos() as i128)
            .unwrap_or(self.now);
        self.stamp()
    }

    fn stamp(&self) -> Timestamp {
        if self.coarse {
            Timestamp::new(self.now.secs, 0)
        } else {
            self.now
        }
    }

    fn ensure_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            let now = self.stamp();
            self.nodes.entry(dir.to_path_buf()).or_insert(MockNode {
                kind: FileKind::Dir,
                contents: Vec::new(),
                atime: now,
                mtime: now,
                ctime: now,
            });
            parent = dir.parent();
        }
    }
}

/// In-memory filesystem with a simulated clock.
///
/// Paths are stored exactly as given (normalised to drop `./`), so tests
/// should use relative paths consistently.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                nodes: BTreeMap::new(),
                now: Timestamp::new(1_700_000_000, 0),
                policy: AtimePolicy::default(),
                coarse: false,
                read_only: BTreeSet::new(),
                unstatable: BTreeSet::new(),
            })),
        }
    }

    pub fn with_policy(self, policy: AtimePolicy) -> Self {
        self.state.lock().unwrap().policy = policy;
        self
    }

    /// Record timestamps with whole-second granularity only.
    pub fn with_coarse_timestamps(self) -> Self {
        self.state.lock().unwrap().coarse = true;
        self
    }

    pub fn now(&self) -> Timestamp {
        self.state.lock().unwrap().stamp()
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now = Timestamp::from_nanos(state.now.as_nanos() + by.as_nanos() as i128)
            .unwrap_or(state.now);
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let _ = FileSystem::write(self, path.as_ref(), &content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        state.ensure_parents(&path);
        let now = state.tick();
        state.nodes.entry(path).or_insert(MockNode {
            kind: FileKind::Dir,
            contents: Vec::new(),
            atime: now,
            mtime: now,
            ctime: now,
        });
    }

    /// `touch`: create the file if missing, otherwise set atime and mtime to now.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        if !state.nodes.contains_key(&path) {
            drop(state);
            self.add_file(&path, Vec::new());
            return;
        }
        let now = state.tick();
        if let Some(node) = state.nodes.get_mut(&path) {
            node.atime = now;
            node.mtime = now;
            node.ctime = now;
        }
    }

    /// Make `set_times` on this path fail with `PermissionDenied`.
    pub fn set_read_only(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.state.lock().unwrap().read_only.insert(path);
    }

    /// Make `stat` on this path fail with `PermissionDenied`.
    pub fn set_unstatable(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.state.lock().unwrap().unstatable.insert(path);
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize(path.as_ref());
        self.state.lock().unwrap().nodes.contains_key(&path)
    }

    pub fn times_of(&self, path: impl AsRef<Path>) -> Option<FileTimes> {
        let path = normalize(path.as_ref());
        let state = self.state.lock().unwrap();
        state
            .nodes
            .get(&path)
            .map(|n| FileTimes::new(n.atime, n.mtime))
    }

    pub fn contents_of(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = normalize(path.as_ref());
        let state = self.state.lock().unwrap();
        state.nodes.get(&path).map(|n| n.contents.clone())
    }

    /// Append bytes to a file, creating it if needed.
    pub fn append(&self, path: impl AsRef<Path>, extra: &[u8]) {
        let path = normalize(path.as_ref());
        let mut contents = self.contents_of(&path).unwrap_or_default();
        contents.extend_from_slice(extra);
        self.add_file(&path, contents);
    }
}

impl FileSystem for MockFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let path = normalize(path);
        let state = self.state.lock().unwrap();
        if state.unstatable.contains(&path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "stat denied"));
        }
        let node = state.nodes.get(&path).ok_or_else(|| not_found(&path))?;
        Ok(FileStat {
            times: FileTimes::new(node.atime, node.mtime),
            kind: node.kind,
            len: node.contents.len() as u64,
        })
    }

    fn set_times(&self, path: &Path, times: FileTimes) -> io::Result<()> {
        let path = normalize(path);
        let mut state = self.state.lock().unwrap();
        if state.read_only.contains(&path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only file system",
            ));
        }
        let now = state.tick();
        let node = state.nodes.get_mut(&path).ok_or_else(|| not_found(&path))?;
        node.atime = times.atime;
        node.mtime = times.mtime;
        node.ctime = now;
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = normalize(path);
        let mut state = self.state.lock().unwrap();
        let now = state.tick();
        let policy = state.policy;
        let node = state.nodes.get_mut(&path).ok_or_else(|| not_found(&path))?;
        let update = match policy {
            AtimePolicy::Strict => true,
            AtimePolicy::NoAtime => false,
            AtimePolicy::Relatime => {
                node.atime <= node.mtime
                    || node.atime <= node.ctime
                    || node
                        .atime
                        .as_nanos()
                        .saturating_add(RELATIME_WINDOW.as_nanos() as i128)
                        <= now.as_nanos()
            }
        };
        if update {
            node.atime = now;
        }
        Ok(node.contents.clone())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let path = normalize(path);
        let mut state = self.state.lock().unwrap();
        state.ensure_parents(&path);
        let now = state.tick();
        let node = state.nodes.entry(path).or_insert(MockNode {
            kind: FileKind::File,
            contents: Vec::new(),
            atime: now,
            mtime: now,
            ctime: now,
        });
        node.contents = contents.to_vec();
        node.mtime = now;
        node.ctime = now;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut state = self.state.lock().unwrap();
        match state.nodes.get(&path) {
            Some(node) if node.kind == FileKind::Dir => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            )),
            Some(_) => {
                state.nodes.remove(&path);
                Ok(())
            }
            None => Err(not_found(&path)),
        }
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| AuditError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?
            .compile_matcher();

        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .keys()
            .filter(|p| {
                // Leading dots must be matched literally, as in a shell.
                let hidden = p
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('.'));
                matcher.is_match(p.as_path()) && (!hidden || pattern_names_dotfile(pattern))
            })
            .cloned()
            .collect())
    }

    fn walk_files(&self, root: &Path, filter: &TreeFilter) -> Result<Vec<PathBuf>> {
        let root_norm = normalize(root);
        let state = self.state.lock().unwrap();

        let mut files = Vec::new();
        for (path, node) in state.nodes.iter() {
            if node.kind != FileKind::File {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&root_norm) else {
                continue;
            };
            let mut names: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let Some(file_name) = names.pop() else {
                continue;
            };
            if names.iter().all(|d| filter.allows_dir(d)) && filter.allows_file(&file_name) {
                files.push(root.join(rel));
            }
        }
        Ok(files)
    }
}

fn pattern_names_dotfile(pattern: &str) -> bool {
    pattern
        .rsplit('/')
        .next()
        .is_some_and(|last| last.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relatime_skips_update_once_atime_is_ahead() {
        let fs = MockFileSystem::new();
        fs.add_file("foo", b"x".to_vec());
        fs.advance(Duration::from_secs(1));

        // First read: atime == mtime, so relatime updates it.
        fs.read(Path::new("foo")).unwrap();
        let after_first = fs.times_of("foo").unwrap().atime;
        fs.advance(Duration::from_secs(1));

        // Second read: atime is now ahead of mtime/ctime, so nothing changes.
        fs.read(Path::new("foo")).unwrap();
        assert_eq!(fs.times_of("foo").unwrap().atime, after_first);
    }

    #[test]
    fn noatime_never_updates() {
        let fs = MockFileSystem::new().with_policy(AtimePolicy::NoAtime);
        fs.add_file("foo", b"x".to_vec());
        let before = fs.times_of("foo").unwrap();
        fs.advance(Duration::from_secs(5));
        fs.read(Path::new("foo")).unwrap();
        assert_eq!(fs.times_of("foo").unwrap(), before);
    }

    #[test]
    fn glob_does_not_cross_separators_or_match_dotfiles() {
        let fs = MockFileSystem::new();
        fs.add_file("a.o", b"".to_vec());
        fs.add_file("sub/b.o", b"".to_vec());
        fs.add_file(".hidden.o", b"".to_vec());

        let found = fs.glob("*.o").unwrap();
        assert_eq!(found, vec![PathBuf::from("a.o")]);
    }

    #[test]
    fn read_only_paths_reject_set_times() {
        let fs = MockFileSystem::new();
        fs.add_file("foo", b"".to_vec());
        fs.set_read_only("foo");
        let times = fs.times_of("foo").unwrap();
        let err = fs.set_times(Path::new("foo"), times).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
