// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AuditError, Result};
use crate::resolve::patterns::validate_pattern;
use crate::resolve::TreeFilter;
use crate::types::OutputFormat;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AuditError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_watch_list(cfg)?;
    validate_patterns(cfg)?;
    validate_roots(cfg)?;
    validate_normalize(cfg)?;
    validate_output(cfg)?;
    Ok(())
}

fn ensure_has_watch_list(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.patterns.is_empty() && cfg.watch.roots.is_empty() {
        return Err(AuditError::ConfigError(
            "nothing to watch: give at least one pattern or tree root".to_string(),
        ));
    }
    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    for pat in &cfg.watch.patterns {
        validate_pattern(pat)?;
    }
    // Compiling the filter checks the exclude globs.
    TreeFilter::new(cfg.watch.exclude.iter().cloned())?;
    Ok(())
}

fn validate_roots(cfg: &RawConfigFile) -> Result<()> {
    for root in &cfg.watch.roots {
        if !root.is_dir() {
            return Err(AuditError::ConfigError(format!(
                "tree root '{}' is not an existing directory",
                root.display()
            )));
        }
    }
    Ok(())
}

fn validate_normalize(cfg: &RawConfigFile) -> Result<()> {
    if cfg.normalize.atime_offset_secs == 0 {
        return Err(AuditError::ConfigError(
            "[normalize].atime_offset_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_output(cfg: &RawConfigFile) -> Result<()> {
    if cfg.output.format == OutputFormat::Deps
        && cfg.output.target.is_none()
        && cfg.output.path.is_none()
    {
        return Err(AuditError::ConfigError(
            "deps output needs a target name (set a target or an output path)".to_string(),
        ));
    }
    if cfg.command.shell.trim().is_empty() {
        return Err(AuditError::ConfigError("[command].shell is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_patterns(patterns: &[&str]) -> RawConfigFile {
        let mut raw = RawConfigFile::default();
        raw.watch.patterns = patterns.iter().map(|s| s.to_string()).collect();
        raw
    }

    #[test]
    fn empty_watch_spec_is_rejected() {
        let err = ConfigFile::try_from(RawConfigFile::default()).unwrap_err();
        assert!(matches!(err, AuditError::ConfigError(msg) if msg.contains("nothing to watch")));
    }

    #[test]
    fn bad_glob_is_rejected() {
        let err = ConfigFile::try_from(with_patterns(&["ok", "[oops"])).unwrap_err();
        assert!(matches!(err, AuditError::InvalidPattern { pattern, .. } if pattern == "[oops"));
    }

    #[test]
    fn zero_offset_is_rejected() {
        let mut raw = with_patterns(&["foo"]);
        raw.normalize.atime_offset_secs = 0;
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn deps_target_defaults_to_output_stem() {
        let mut raw = with_patterns(&["foo"]);
        raw.output.format = OutputFormat::Deps;
        assert!(ConfigFile::try_from(raw.clone()).is_err());

        raw.output.path = Some("build/foo.d".into());
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.deps_target().as_deref(), Some("build/foo"));
    }

    #[test]
    fn missing_root_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.roots = vec!["/definitely/not/here/atimewatch".into()];
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, AuditError::ConfigError(msg) if msg.contains("not an existing directory")));
    }
}
