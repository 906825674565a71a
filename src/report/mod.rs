// src/report/mod.rs

//! Writing classified changes out.
//!
//! The driver hands a finished [`RunReport`] to a [`Reporter`]; which
//! reporter and which sink are picked from the output configuration:
//!
//! - [`text::TextReporter`]: `<TAG>: <path>` lines, stderr by default.
//! - [`deps::DepsReporter`]: a Make rule, stdout by default.
//! - [`json::JsonReporter`]: a report document `atimewatch query` reads back.

pub mod deps;
pub mod json;
pub mod text;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::ConfigFile;
use crate::driver::RunReport;
use crate::errors::{AuditError, Result};
use crate::types::OutputFormat;

pub use deps::DepsReporter;
pub use json::{JsonChange, JsonChanges, JsonReport, JsonReporter};
pub use text::TextReporter;

/// Consumer of a finished run.
pub trait Reporter {
    fn report(&mut self, run: &RunReport) -> Result<()>;
}

/// Where a reporter writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl Sink {
    /// The sink used when no output path is configured.
    pub fn default_for(format: OutputFormat, path: Option<&Path>) -> Self {
        match (path, format) {
            (Some(p), _) => Sink::File(p.to_path_buf()),
            (None, OutputFormat::Text) => Sink::Stderr,
            (None, _) => Sink::Stdout,
        }
    }

    /// Open the sink, creating parent directories of a file sink.
    pub fn open(&self) -> Result<Box<dyn Write + Send>> {
        match self {
            Sink::Stdout => Ok(Box::new(io::stdout())),
            Sink::Stderr => Ok(Box::new(io::stderr())),
            Sink::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("creating output directory {}", parent.display())
                    })?;
                }
                let file = File::create(path)
                    .with_context(|| format!("creating output file {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

/// Build the reporter described by the output section of `cfg`.
///
/// The sink is opened lazily by the reporter, so a run that never gets to
/// reporting does not leave an empty output file behind.
pub fn reporter_for(cfg: &ConfigFile) -> Result<Box<dyn Reporter + Send>> {
    let sink = Sink::default_for(cfg.output.format, cfg.output.path.as_deref());
    match cfg.output.format {
        OutputFormat::Text => Ok(Box::new(TextReporter::new(
            LazySink::new(sink),
            cfg.output.verbose,
        ))),
        OutputFormat::Deps => {
            let target = cfg.deps_target().ok_or_else(|| {
                AuditError::ConfigError("deps output needs a target name".to_string())
            })?;
            Ok(Box::new(DepsReporter::new(LazySink::new(sink), target)))
        }
        OutputFormat::Json => Ok(Box::new(JsonReporter::new(LazySink::new(sink)))),
    }
}

/// A [`Sink`] that is only opened on first write.
pub struct LazySink {
    sink: Sink,
    inner: Option<Box<dyn Write + Send>>,
}

impl LazySink {
    pub fn new(sink: Sink) -> Self {
        Self { sink, inner: None }
    }

    fn get(&mut self) -> io::Result<&mut Box<dyn Write + Send>> {
        if self.inner.is_none() {
            let opened = self.sink.open().map_err(io::Error::other)?;
            self.inner = Some(opened);
        }
        // Just populated above.
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("output sink not open"))
    }
}

impl Write for LazySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.get()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}
