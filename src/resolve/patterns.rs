// src/resolve/patterns.rs

use std::fmt;

use glob::Pattern;
use tracing::debug;

use crate::errors::{AuditError, Result};
use crate::fs::FileSystem;
use crate::resolve::{Origin, PathResolver, Resolution};

/// Split a delimiter-separated watch list (`foo:bar/*.o`) into its items,
/// dropping empty segments.
pub fn split_watch_list(spec: &str, sep: char) -> Vec<String> {
    spec.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check a pattern's glob syntax without touching the filesystem.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    Pattern::new(pattern)
        .map(|_| ())
        .map_err(|e| AuditError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Resolves a list of shell glob patterns.
///
/// Every resolution re-expands the original patterns, so a pattern that
/// matched nothing before the command can yield several new paths after it.
#[derive(Clone)]
pub struct PatternResolver {
    patterns: Vec<String>,
}

impl fmt::Debug for PatternResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternResolver")
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl PatternResolver {
    /// Compile-check every pattern. A malformed pattern is a configuration
    /// error for the whole run.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        for pat in &patterns {
            validate_pattern(pat)?;
        }
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl PathResolver for PatternResolver {
    fn resolve(&self, fs: &dyn FileSystem) -> Result<Resolution> {
        let mut resolution = Resolution::new();

        for pattern in &self.patterns {
            let found = fs.glob(pattern)?;
            if found.is_empty() {
                debug!(pattern = %pattern, "pattern matches nothing");
                resolution.add_unmatched(pattern);
                continue;
            }
            debug!(pattern = %pattern, matches = found.len(), "pattern expanded");
            for path in found {
                resolution.add_path(
                    path,
                    Origin::Matched {
                        pattern: pattern.clone(),
                    },
                );
            }
        }

        Ok(resolution)
    }
}
