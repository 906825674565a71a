// src/resolve/tree.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::{AuditError, Result};
use crate::fs::FileSystem;
use crate::resolve::{Origin, PathResolver, Resolution};

/// Names skipped by every tree walk: VCS metadata and editor swap files.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".svn", "*.swp"];

/// Name-based pruning for directory-tree resolution.
///
/// Patterns are matched against a single directory or file *name*, not the
/// whole path, so `.git` prunes every `.git` directory at any depth.
#[derive(Clone)]
pub struct TreeFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for TreeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeFilter")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl TreeFilter {
    /// Filter with only [`DEFAULT_EXCLUDES`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(std::iter::empty::<String>())
    }

    /// Build a filter from `extra` patterns on top of [`DEFAULT_EXCLUDES`].
    pub fn new<I, S>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        for pat in extra {
            let pat = pat.into();
            if !patterns.contains(&pat) {
                patterns.push(pat);
            }
        }
        let set = build_globset(&patterns)?;
        Ok(Self { patterns, set })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn allows_dir(&self, name: &str) -> bool {
        !self.set.is_match(name)
    }

    pub fn allows_file(&self, name: &str) -> bool {
        !self.set.is_match(name)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| AuditError::InvalidPattern {
            pattern: pat.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    Ok(builder
        .build()
        .context("building exclude globset")?)
}

/// Resolves every regular file below a set of root directories.
#[derive(Debug, Clone)]
pub struct TreeResolver {
    roots: Vec<PathBuf>,
    filter: TreeFilter,
    /// Individual files left out of the walk, unlike the name-based filter.
    excluded: Vec<PathBuf>,
}

impl TreeResolver {
    pub fn new(roots: Vec<PathBuf>, filter: TreeFilter) -> Self {
        Self {
            roots,
            filter,
            excluded: Vec::new(),
        }
    }

    /// Leave out the one file at `path`. Files with the same name elsewhere
    /// in the tree are still walked.
    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Excluded files located under `root`, relative to it.
    fn excluded_under(&self, root: &Path) -> Vec<PathBuf> {
        let abs_root = std::path::absolute(root).ok();
        self.excluded
            .iter()
            .filter_map(|path| {
                if let Ok(rel) = path.strip_prefix(root) {
                    return Some(rel.to_path_buf());
                }
                // One side relative, the other absolute, or a `./` prefix.
                let abs = std::path::absolute(path).ok()?;
                abs.strip_prefix(abs_root.as_ref()?).ok().map(Path::to_path_buf)
            })
            .collect()
    }
}

impl PathResolver for TreeResolver {
    fn resolve(&self, fs: &dyn FileSystem) -> Result<Resolution> {
        let mut resolution = Resolution::new();
        for root in &self.roots {
            let excluded = self.excluded_under(root);
            let files = fs.walk_files(root, &self.filter)?;
            debug!(root = %root.display(), files = files.len(), "walked tree root");
            for path in files {
                let rel = path.strip_prefix(root).unwrap_or(path.as_path());
                if excluded.iter().any(|e| e == rel) {
                    debug!(path = %path.display(), "excluded file skipped");
                    continue;
                }
                resolution.add_path(path, Origin::Walked { root: root.clone() });
            }
        }
        Ok(resolution)
    }
}
