// src/errors.rs

//! Crate-wide error type.
//!
//! Only configuration and precondition problems are meant to reach the
//! binary's exit path. Per-path failures during a snapshot are absorbed and
//! logged where they happen; a failing wrapped command is not an error at all.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Duplicate path in snapshot: {0}")]
    DuplicatePath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AuditError>;
