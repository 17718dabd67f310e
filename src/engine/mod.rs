//! Engine module: algorithm registry, per-file digesting, and the CLI surface.

pub mod arg_parser;
pub mod cli;
pub mod hashing;
pub mod registry;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::{handle_run, path_source, render_report, select_algorithms};
pub use hashing::DigestEngine;
pub use registry::{Algorithm, AlgorithmSet, Hashed, Registry, SinkFactory, StreamingDigest};
