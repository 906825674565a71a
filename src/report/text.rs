// src/report/text.rs

use std::io::Write;

use crate::driver::RunReport;
use crate::errors::Result;
use crate::report::Reporter;

/// One `<TAG>: <path>` line per change.
///
/// In verbose mode each line also carries ` [<cwd>] (<command>)`, and a
/// leading `[<MAKELEVEL>] ` under make, so lines from nested builds can be
/// told apart.
pub struct TextReporter<W: Write> {
    out: W,
    verbose: bool,
    make_level: Option<String>,
}

impl<W: Write> TextReporter<W> {
    /// Picks up the make nesting level from `MAKELEVEL`.
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            make_level: std::env::var("MAKELEVEL").ok().filter(|l| !l.is_empty()),
        }
    }

    pub fn with_make_level(mut self, level: Option<String>) -> Self {
        self.make_level = level;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report(&mut self, run: &RunReport) -> Result<()> {
        for change in run.changes.iter() {
            if let (true, Some(level)) = (self.verbose, &self.make_level) {
                write!(self.out, "[{level}] ")?;
            }
            write!(self.out, "{}: {}", change.kind.tag(), change.path)?;
            if self.verbose {
                write!(self.out, " [{}] ({})", run.cwd.display(), run.command)?;
            }
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::tests::sample_report;

    #[test]
    fn one_line_per_change_in_path_order() {
        let mut rep = TextReporter::new(Vec::new(), false).with_make_level(Some("1".into()));
        rep.report(&sample_report()).unwrap();
        let out = String::from_utf8(rep.into_inner()).unwrap();
        assert_eq!(
            out,
            "ACCESSED: a.h\nCREATED: a.o\nMODIFIED: log.txt\nREMOVED: old.o\n"
        );
    }

    #[test]
    fn verbose_lines_carry_cwd_and_command() {
        let mut rep = TextReporter::new(Vec::new(), true).with_make_level(None);
        rep.report(&sample_report()).unwrap();
        let out = String::from_utf8(rep.into_inner()).unwrap();
        let first = out.lines().next().unwrap();
        assert_eq!(first, "ACCESSED: a.h [/work] (/bin/sh -c 'cc -c a.c')");
    }

    #[test]
    fn verbose_lines_under_make_carry_the_level() {
        let mut rep = TextReporter::new(Vec::new(), true).with_make_level(Some("2".into()));
        rep.report(&sample_report()).unwrap();
        let out = String::from_utf8(rep.into_inner()).unwrap();
        let first = out.lines().next().unwrap();
        assert_eq!(first, "[2] ACCESSED: a.h [/work] (/bin/sh -c 'cc -c a.c')");
    }
}
