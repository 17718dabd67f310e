//! Public and internal types for the xhash API and pipeline.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::registry::Algorithm;
use crate::error::{ConfigError, DigestError};
use crate::utils::config::{DEFAULT_DIGESTERS, HashingConsts};

/// One regular file discovered by a path source. Consumed by exactly one digest operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    /// Size from the enumeration `stat`; selects the digest strategy.
    pub size_hint: u64,
}

/// Digest bytes per algorithm, in canonical algorithm order.
pub type Digests = BTreeMap<Algorithm, Vec<u8>>;

/// Outcome for one file: either every enabled digest or a single error, never both.
#[derive(Debug)]
pub struct DigestResult {
    pub path: PathBuf,
    pub outcome: Result<Digests, DigestError>,
}

impl DigestResult {
    pub fn digests(&self) -> Option<&Digests> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&DigestError> {
        self.outcome.as_ref().err()
    }
}

/// Map of path to digests for a completed run. Unordered; sort for presentation.
pub type DigestMap = HashMap<PathBuf, Digests>;

/// How many digest operations may run at once.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One file at a time, on the enumeration thread.
    Serial,
    /// A new worker for every discovered file.
    Parallel,
    /// A fixed pool of [`Opts::digesters`] workers.
    #[default]
    Bounded,
}

impl ExecutionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Serial => "serial",
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Bounded => "bounded",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(ExecutionMode::Serial),
            "parallel" => Ok(ExecutionMode::Parallel),
            "bounded" => Ok(ExecutionMode::Bounded),
            _ => Err(ConfigError::Mode(s.to_string())),
        }
    }
}

/// Caller-level reaction to a per-file error in the result stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop draining on the first failed file; the run fails with that error.
    #[default]
    AbortOnFirst,
    /// Record failures, keep going, and succeed with a failure list.
    Continue,
}

/// Options for [`digest_paths`](crate::digest_paths) and the pipeline.
#[derive(Clone, Debug)]
pub struct Opts {
    pub mode: ExecutionMode,
    /// Worker count for [`ExecutionMode::Bounded`]. Must be at least 1.
    pub digesters: usize,
    /// Enabled algorithms; resolved against the standard registry.
    pub algorithms: Vec<Algorithm>,
    pub error_policy: ErrorPolicy,
    /// Files smaller than this are read into memory; larger ones are streamed to every sink.
    pub small_file_threshold: u64,
    /// Broadcast chunk size for streamed files.
    pub chunk_size: usize,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            digesters: DEFAULT_DIGESTERS,
            algorithms: vec![Algorithm::Md5],
            error_policy: ErrorPolicy::default(),
            small_file_threshold: HashingConsts::SMALL_FILE_THRESHOLD,
            chunk_size: HashingConsts::CHUNK_SIZE,
        }
    }
}

/// Result of a collected run: digests for every successful file, plus failures kept under
/// [`ErrorPolicy::Continue`].
#[derive(Debug, Default)]
pub struct DigestReport {
    pub digests: DigestMap,
    pub failures: Vec<DigestError>,
    /// Number of regular files the source enumerated.
    pub enumerated: usize,
}
