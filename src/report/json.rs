// src/report/json.rs

use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::diff::ChangeSet;
use crate::driver::RunReport;
use crate::errors::Result;
use crate::report::Reporter;
use crate::types::{Classification, FileTimes, Timestamp};

/// On-disk form of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonReport {
    pub command: String,
    pub cwd: PathBuf,
    pub exit_status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    pub started_ns: u64,
    pub finished_ns: u64,
    /// Paths that existed before the run.
    pub prior_count: usize,
    /// Paths that existed after the run.
    pub after_count: usize,
    #[serde(default)]
    pub incomplete: bool,
    pub changes: JsonChanges,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonChanges {
    #[serde(default)]
    pub created: Vec<JsonChange>,
    #[serde(default)]
    pub modified: Vec<JsonChange>,
    #[serde(default)]
    pub accessed: Vec<JsonChange>,
    #[serde(default)]
    pub removed: Vec<JsonChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonChange {
    pub path: String,
    pub pre: Option<FileTimes>,
    pub post: Option<FileTimes>,
}

impl JsonChange {
    /// Post-run atime, falling back to the pre-run one for removed paths.
    pub fn last_atime(&self) -> Option<Timestamp> {
        self.post.or(self.pre).map(|t| t.atime)
    }
}

impl JsonChanges {
    pub fn from_change_set(changes: &ChangeSet) -> Self {
        let mut out = JsonChanges::default();
        for change in changes.iter() {
            let entry = JsonChange {
                path: change.path.clone(),
                pre: change.pre,
                post: change.post,
            };
            out.bucket_mut(change.kind).push(entry);
        }
        out
    }

    pub fn bucket(&self, kind: Classification) -> &[JsonChange] {
        match kind {
            Classification::Created => &self.created,
            Classification::Modified => &self.modified,
            Classification::Accessed => &self.accessed,
            Classification::Removed => &self.removed,
        }
    }

    fn bucket_mut(&mut self, kind: Classification) -> &mut Vec<JsonChange> {
        match kind {
            Classification::Created => &mut self.created,
            Classification::Modified => &mut self.modified,
            Classification::Accessed => &mut self.accessed,
            Classification::Removed => &mut self.removed,
        }
    }
}

impl From<&RunReport> for JsonReport {
    fn from(run: &RunReport) -> Self {
        JsonReport {
            command: run.command.clone(),
            cwd: run.cwd.clone(),
            exit_status: run.status.code,
            signal: run.status.signal,
            started_ns: run.started_ns,
            finished_ns: run.finished_ns,
            prior_count: run.pre_count,
            after_count: run.post_count,
            incomplete: run.incomplete,
            changes: JsonChanges::from_change_set(&run.changes),
        }
    }
}

/// Pretty-printed [`JsonReport`] followed by a newline.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn report(&mut self, run: &RunReport) -> Result<()> {
        let doc = JsonReport::from(run);
        serde_json::to_writer_pretty(&mut self.out, &doc)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::tests::sample_report;

    #[test]
    fn report_reads_back() {
        let run = sample_report();
        let mut rep = JsonReporter::new(Vec::new());
        rep.report(&run).unwrap();

        let doc: JsonReport = serde_json::from_slice(&rep.into_inner()).unwrap();
        assert_eq!(doc.exit_status, 2);
        assert_eq!(doc.prior_count, 3);
        assert_eq!(doc.changes.created.len(), 1);
        assert_eq!(doc.changes.removed[0].path, "old.o");
        assert!(doc.changes.removed[0].post.is_none());
    }

    #[test]
    fn buckets_are_named_in_lowercase() {
        let mut rep = JsonReporter::new(Vec::new());
        rep.report(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&rep.into_inner()).unwrap();
        let changes = value.get("changes").unwrap();
        for key in ["created", "modified", "accessed", "removed"] {
            assert!(changes.get(key).is_some(), "missing {key}");
        }
        assert!(value.get("signal").is_none());
    }

    #[test]
    fn last_atime_falls_back_to_pre() {
        let t = FileTimes::new(Timestamp::new(5, 0), Timestamp::new(9, 0));
        let removed = JsonChange {
            path: "x".into(),
            pre: Some(t),
            post: None,
        };
        assert_eq!(removed.last_atime(), Some(Timestamp::new(5, 0)));
    }
}
