// src/report/deps.rs

use std::io::Write;

use crate::driver::RunReport;
use crate::errors::Result;
use crate::report::Reporter;

/// Writes a Make rule naming every read or created path as a prerequisite
/// of `target`, followed by an empty rule per prerequisite so Make does not
/// fail once one of them is deleted.
///
/// The rule is written even when there are no prerequisites.
pub struct DepsReporter<W: Write> {
    out: W,
    target: String,
}

impl<W: Write> DepsReporter<W> {
    pub fn new(out: W, target: impl Into<String>) -> Self {
        Self {
            out,
            target: target.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for DepsReporter<W> {
    fn report(&mut self, run: &RunReport) -> Result<()> {
        let prereqs: Vec<&str> = run
            .changes
            .prerequisites()
            .into_iter()
            .filter(|p| *p != self.target)
            .collect();

        if prereqs.is_empty() {
            writeln!(self.out, "{}:", self.target)?;
        } else {
            writeln!(self.out, "{}: \\", self.target)?;
            let last = prereqs.len() - 1;
            for (i, p) in prereqs.iter().enumerate() {
                if i < last {
                    writeln!(self.out, "  {p} \\")?;
                } else {
                    writeln!(self.out, "  {p}")?;
                }
            }
            for p in &prereqs {
                write!(self.out, "\n{p}:\n")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeSet;
    use crate::driver::tests::sample_report;

    #[test]
    fn accessed_and_created_become_prerequisites() {
        let mut rep = DepsReporter::new(Vec::new(), "prog");
        rep.report(&sample_report()).unwrap();
        let out = String::from_utf8(rep.into_inner()).unwrap();
        assert_eq!(out, "prog: \\\n  a.h \\\n  a.o\n\na.h:\n\na.o:\n");
    }

    #[test]
    fn target_itself_is_never_its_own_prerequisite() {
        let mut rep = DepsReporter::new(Vec::new(), "a.o");
        rep.report(&sample_report()).unwrap();
        let out = String::from_utf8(rep.into_inner()).unwrap();
        assert_eq!(out, "a.o: \\\n  a.h\n\na.h:\n");
    }

    #[test]
    fn rule_is_written_without_prerequisites() {
        let mut run = sample_report();
        run.changes = ChangeSet::default();
        let mut rep = DepsReporter::new(Vec::new(), "prog");
        rep.report(&run).unwrap();
        assert_eq!(String::from_utf8(rep.into_inner()).unwrap(), "prog:\n");
    }
}
