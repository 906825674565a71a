// src/resolve/mod.rs

//! Path resolution: turning the watch list into a concrete,
//! ordered set of paths at one point in time.
//!
//! Resolution runs twice per invocation, once before and once after the
//! wrapped command, and each run starts from the original patterns/roots.
//! A pattern that matches nothing is recorded as an [`Origin::Unmatched`]
//! placeholder keyed by its literal text, so a later appearance of that path
//! is seen as a creation instead of an error.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;

use crate::errors::Result;
use crate::fs::{path_key, FileSystem};

pub mod patterns;
pub mod tree;

pub use patterns::{split_watch_list, PatternResolver};
pub use tree::{TreeFilter, TreeResolver, DEFAULT_EXCLUDES};

/// Where a resolved path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A concrete match of a glob pattern.
    Matched { pattern: String },
    /// A regular file found under a tree root.
    Walked { root: PathBuf },
    /// A pattern that currently matches nothing; the key is its literal text.
    Unmatched { pattern: String },
}

impl Origin {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Origin::Unmatched { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Snapshot identity (see [`path_key`]).
    pub key: String,
    pub path: PathBuf,
    pub origin: Origin,
}

/// Ordered, deduplicated result of one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    paths: BTreeMap<String, ResolvedPath>,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a concrete path. The first origin seen for a key wins, except
    /// that a concrete match always replaces a zero-match placeholder.
    pub fn add_path(&mut self, path: PathBuf, origin: Origin) {
        let key = path_key(&path);
        match self.paths.get(&key) {
            Some(existing) if !existing.origin.is_placeholder() => {}
            _ => {
                self.paths.insert(key.clone(), ResolvedPath { key, path, origin });
            }
        }
    }

    /// Record that `pattern` matched nothing.
    pub fn add_unmatched(&mut self, pattern: &str) {
        let path = PathBuf::from(pattern);
        let key = path_key(&path);
        self.paths.entry(key.clone()).or_insert(ResolvedPath {
            key,
            path,
            origin: Origin::Unmatched {
                pattern: pattern.to_string(),
            },
        });
    }

    pub fn merge(&mut self, other: Resolution) {
        for (_, rp) in other.paths {
            match rp.origin {
                Origin::Unmatched { pattern } => self.add_unmatched(&pattern),
                origin => self.add_path(rp.path, origin),
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedPath> {
        self.paths.values()
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedPath> {
        self.paths.get(key)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Something that can expand a watch list into paths.
pub trait PathResolver: Send + Sync + Debug {
    fn resolve(&self, fs: &dyn FileSystem) -> Result<Resolution>;
}

/// Union of several resolvers (e.g. `--watch` patterns plus `--tree` roots).
#[derive(Debug, Default)]
pub struct CompositeResolver {
    parts: Vec<Box<dyn PathResolver>>,
}

impl CompositeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl PathResolver + 'static) -> Self {
        self.parts.push(Box::new(resolver));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl PathResolver for CompositeResolver {
    fn resolve(&self, fs: &dyn FileSystem) -> Result<Resolution> {
        let mut all = Resolution::new();
        for part in &self.parts {
            all.merge(part.resolve(fs)?);
        }
        Ok(all)
    }
}
