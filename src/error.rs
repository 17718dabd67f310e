//! Typed errors for enumeration, per-file digesting, and algorithm resolution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::registry::Algorithm;

/// Failure while discovering candidate paths. Always fatal to the whole run.
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// Directory walk failed (missing root, unreadable directory, loop).
    #[error("walk {}: {source}", path.display())]
    Walk { path: PathBuf, source: io::Error },

    /// `stat` of an explicitly listed path failed.
    #[error("stat {}: {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },

    /// The newline-delimited path list could not be opened or read.
    #[error("path list {}: {source}", path.display())]
    ListFile { path: PathBuf, source: io::Error },

    /// A digest worker thread could not be started.
    #[error("could not start digest worker: {source}")]
    Spawn { source: io::Error },

    /// Enumeration stopped because the pipeline was cancelled.
    #[error("enumeration canceled")]
    Cancelled,
}

/// Failure scoped to a single file. Attached to that file's result.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// An algorithm implementation failed internally while digesting.
    #[error("{algorithm} failed on {}: {reason}", path.display())]
    Sink {
        path: PathBuf,
        algorithm: Algorithm,
        reason: String,
    },

    /// Digest abandoned at a cancellation checkpoint.
    #[error("digest of {} canceled", path.display())]
    Cancelled { path: PathBuf },
}

impl DigestError {
    pub fn path(&self) -> &PathBuf {
        match self {
            DigestError::Open { path, .. }
            | DigestError::Read { path, .. }
            | DigestError::Sink { path, .. }
            | DigestError::Cancelled { path } => path,
        }
    }
}

/// Algorithm name or set could not be resolved against the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown algorithm `{0}`")]
    Unknown(String),

    #[error("algorithm {0} is not available in this registry")]
    Unsupported(Algorithm),

    #[error("no algorithm enabled")]
    Empty,
}

/// Invalid configuration value from a file, the environment, or the command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid execution mode `{0}` (expected serial, parallel or bounded)")]
    Mode(String),

    #[error("invalid value for {name}: `{value}` (expected a positive integer)")]
    Digesters { name: &'static str, value: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
