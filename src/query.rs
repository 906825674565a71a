// src/query.rs

//! Reading paths back out of a JSON report.

use std::fs;
use std::path::Path;

use crate::errors::Result;
use crate::report::{JsonChange, JsonReport};
use crate::types::{Classification, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    /// Oldest last-access first; the order a build actually read things.
    #[default]
    ByAtime,
    Alphabetical,
}

pub fn load_report(path: impl AsRef<Path>) -> Result<JsonReport> {
    let contents = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&contents)?)
}

/// Paths in the requested categories. An empty `kinds` selects all of them.
pub fn select(report: &JsonReport, kinds: &[Classification], order: QueryOrder) -> Vec<String> {
    let kinds: &[Classification] = if kinds.is_empty() {
        &Classification::ALL
    } else {
        kinds
    };

    let mut picked: Vec<&JsonChange> = kinds
        .iter()
        .flat_map(|k| report.changes.bucket(*k).iter())
        .collect();

    match order {
        QueryOrder::ByAtime => picked.sort_by(|a, b| {
            let ka = a.last_atime().unwrap_or(Timestamp::new(i64::MIN, 0));
            let kb = b.last_atime().unwrap_or(Timestamp::new(i64::MIN, 0));
            ka.cmp(&kb).then_with(|| a.path.cmp(&b.path))
        }),
        QueryOrder::Alphabetical => picked.sort_by(|a, b| a.path.cmp(&b.path)),
    }

    let mut paths: Vec<String> = picked.into_iter().map(|c| c.path.clone()).collect();
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::tests::sample_report;

    fn report() -> JsonReport {
        JsonReport::from(&sample_report())
    }

    #[test]
    fn default_order_is_by_last_access() {
        let paths = select(&report(), &[], QueryOrder::ByAtime);
        // old.o only has its pre-run atime (1), the others were touched later.
        assert_eq!(paths, vec!["old.o", "a.o", "log.txt", "a.h"]);
    }

    #[test]
    fn selectors_restrict_categories() {
        let paths = select(
            &report(),
            &[Classification::Created, Classification::Accessed],
            QueryOrder::Alphabetical,
        );
        assert_eq!(paths, vec!["a.h", "a.o"]);
    }

    #[test]
    fn load_report_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        fs::write(&path, serde_json::to_string(&report()).unwrap()).unwrap();
        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded, report());
    }
}
