use clap::Parser;
use std::path::PathBuf;

use crate::engine::registry::Algorithm;
use crate::error::ConfigError;
use crate::types::ExecutionMode;
use crate::utils::env::parse_digesters;

fn parse_digesters_arg(value: &str) -> Result<usize, ConfigError> {
    parse_digesters("--digesters", value)
}

/// Compute file digests for a directory tree or a list of files, with several algorithms at once.
#[derive(Clone, Parser)]
#[command(name = "xhash")]
#[command(about = "Digest every regular file under DIR (or the given files) with one or more algorithms.")]
pub struct Cli {
    /// One directory to walk, or files to digest. Default: current directory.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Read paths to digest from FILE, one per line.
    #[arg(long, short = 'T', value_name = "FILE", conflicts_with = "paths")]
    pub files_from: Option<PathBuf>,

    /// Execution mode: serial, parallel, or bounded. Default: bounded.
    #[arg(long, short = 'm', value_name = "MODE")]
    pub mode: Option<ExecutionMode>,

    /// Worker count for bounded mode. Default: DIGESTERS env var, then 20.
    #[arg(long, short = 'j', value_name = "N", value_parser = parse_digesters_arg)]
    pub digesters: Option<usize>,

    /// Enable an algorithm (repeatable), e.g. -a md5 -a sha3-256. Default: MD5.
    #[arg(long = "algorithm", short = 'a', value_name = "NAME")]
    pub algorithms: Vec<Algorithm>,

    /// Enable every algorithm except those given with -a.
    #[arg(long)]
    pub all: bool,

    /// Report unreadable files and keep going instead of stopping at the first one.
    #[arg(long, short = 'k', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub keep_going: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Print the supported algorithms and exit.
    #[arg(long)]
    pub list_algorithms: bool,
}
