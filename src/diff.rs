// src/diff.rs

//! Classifying each watched path by comparing its two generations.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::snapshot::{Snapshot, WatchEntry};
use crate::types::{Classification, FileTimes};

/// Classify a single path from its pre and post entries.
///
/// Existence transitions are checked first, then mtime, then atime, so a
/// path that was both read and written is always `Modified`. `None` means
/// unchanged (or absent in both generations) and is never reported.
pub fn classify(pre: Option<&WatchEntry>, post: Option<&WatchEntry>) -> Option<Classification> {
    let before = pre.and_then(|e| e.times);
    let after = post.and_then(|e| e.times);

    match (before, after) {
        (None, None) => None,
        (None, Some(_)) => Some(Classification::Created),
        (Some(_), None) => Some(Classification::Removed),
        (Some(b), Some(a)) if a.mtime > b.mtime => Some(Classification::Modified),
        (Some(b), Some(a)) if a.atime > b.atime => Some(Classification::Accessed),
        (Some(_), Some(_)) => None,
    }
}

/// One reported path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub path: String,
    pub kind: Classification,
    pub pre: Option<FileTimes>,
    pub post: Option<FileTimes>,
}

/// Diff two generations over the sorted union of their keys.
///
/// Keys skipped in either generation are left out entirely.
pub fn diff(pre: &Snapshot, post: &Snapshot) -> ChangeSet {
    let keys: BTreeSet<&str> = pre.keys().chain(post.keys()).collect();

    let changes = keys
        .into_iter()
        .filter(|key| !pre.is_skipped(key) && !post.is_skipped(key))
        .filter_map(|key| {
            let before = pre.get(key);
            let after = post.get(key);
            classify(before, after).map(|kind| Change {
                path: key.to_string(),
                kind,
                pre: before.and_then(|e| e.times),
                post: after.and_then(|e| e.times),
            })
        })
        .collect();

    ChangeSet { changes }
}

/// The ordered result of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn from_changes(mut changes: Vec<Change>) -> Self {
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        Self { changes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn of_kind(&self, kind: Classification) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }

    pub fn count(&self, kind: Classification) -> usize {
        self.of_kind(kind).count()
    }

    pub fn kind_of(&self, path: &str) -> Option<Classification> {
        self.changes.iter().find(|c| c.path == path).map(|c| c.kind)
    }

    /// Paths that were read or came into existence, in path order.
    pub fn prerequisites(&self) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|c| matches!(c.kind, Classification::Accessed | Classification::Created))
            .map(|c| c.path.as_str())
            .collect()
    }
}
