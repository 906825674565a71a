// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A filesystem timestamp as a `(seconds, nanoseconds)` pair.
///
/// Ordering is lexicographic on `(secs, nanos)`, so equal seconds with a
/// greater nanosecond part compare as later. Filesystems with only
/// second granularity report `nanos == 0`, which makes equal coarse
/// timestamps compare equal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    pub secs: i64,
    /// Always `< 1_000_000_000`.
    pub nanos: u32,
}

impl Timestamp {
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// Build a timestamp from a signed nanosecond count since the epoch.
    pub fn from_nanos(total: i128) -> Option<Self> {
        let secs = i64::try_from(total.div_euclid(NANOS_PER_SEC)).ok()?;
        let nanos = total.rem_euclid(NANOS_PER_SEC) as u32;
        Some(Self { secs, nanos })
    }

    pub fn as_nanos(&self) -> i128 {
        i128::from(self.secs) * NANOS_PER_SEC + i128::from(self.nanos)
    }

    /// `self - offset`, or `None` on overflow.
    pub fn checked_sub(&self, offset: Duration) -> Option<Self> {
        let offset = i128::try_from(offset.as_nanos()).ok()?;
        Self::from_nanos(self.as_nanos() - offset)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

/// The access/modification pair recorded for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    pub atime: Timestamp,
    pub mtime: Timestamp,
}

impl FileTimes {
    pub const fn new(atime: Timestamp, mtime: Timestamp) -> Self {
        Self { atime, mtime }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Other,
}

/// What a `stat` of a single path tells us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub times: FileTimes,
    pub kind: FileKind,
    pub len: u64,
}

/// Which of the two snapshot passes an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Pre,
    Post,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Pre => f.write_str("pre"),
            Generation::Post => f.write_str("post"),
        }
    }
}

/// Outcome of comparing one path across the two generations.
///
/// "Unchanged" is not a variant: unchanged paths are never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Created,
    Modified,
    Accessed,
    Removed,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::Created,
        Classification::Modified,
        Classification::Accessed,
        Classification::Removed,
    ];

    /// Upper-case tag used in line-oriented output.
    pub fn tag(&self) -> &'static str {
        match self {
            Classification::Created => "CREATED",
            Classification::Modified => "MODIFIED",
            Classification::Accessed => "ACCESSED",
            Classification::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How classified changes are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<TAG>: <path>` lines.
    Text,
    /// A Make rule listing prerequisites of a target.
    Deps,
    /// A JSON report that `atimewatch query` can read back.
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "deps" => Ok(OutputFormat::Deps),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "invalid output format: {other} (expected \"text\", \"deps\" or \"json\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_order_by_seconds_then_nanos() {
        let a = Timestamp::new(10, 999_999_999);
        let b = Timestamp::new(11, 0);
        let c = Timestamp::new(11, 1);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(Timestamp::new(5, 0), Timestamp::new(5, 0));
    }

    #[test]
    fn checked_sub_borrows_from_seconds() {
        let ts = Timestamp::new(100, 500);
        let back = ts.checked_sub(Duration::new(1, 1_000)).unwrap();
        assert_eq!(back, Timestamp::new(98, 999_999_500));
    }

    #[test]
    fn checked_sub_goes_negative_before_epoch() {
        let ts = Timestamp::new(10, 0);
        let back = ts.checked_sub(Duration::from_secs(86_400)).unwrap();
        assert_eq!(back.secs, 10 - 86_400);
        assert_eq!(back.nanos, 0);
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
