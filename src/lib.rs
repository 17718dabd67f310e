//! xhash: concurrent multi-algorithm file digester

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use engine::{Algorithm, AlgorithmSet, DigestEngine, Registry};
pub use error::{ConfigError, DigestError, EnumerationError, RegistryError};
pub use pipeline::{DigestStream, PathSource, PipelineStats};
pub use types::*;

use log::debug;
use std::sync::Arc;

/// Result alias used by public xhash API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Build the digest engine for `opts` against the standard registry.
pub fn engine_for(opts: &Opts) -> Result<DigestEngine> {
    let algorithms = Registry::standard().resolve(&opts.algorithms)?;
    Ok(DigestEngine::new(Arc::new(algorithms))
        .with_small_file_threshold(opts.small_file_threshold)
        .with_chunk_size(opts.chunk_size))
}

/// Start a run and return the raw result stream. Use when results should be handled as they
/// arrive; [`digest_paths`] drains and applies the error policy for you.
pub fn digest_stream(source: PathSource, opts: &Opts) -> Result<DigestStream> {
    let engine = engine_for(opts)?;
    pipeline::run_pipeline(source, engine, opts.mode, opts.digesters)
}

/// Single entry point: digest every file `source` yields and collect the results.
///
/// Per-file errors follow `opts.error_policy`; an enumeration error always fails the run.
pub fn digest_paths(source: PathSource, opts: &Opts) -> Result<DigestReport> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let stream = digest_stream(source, opts)?;
    pipeline::collect_results(stream, opts.error_policy)
}
