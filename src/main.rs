//! xhash CLI: digest a directory tree or a list of files with one or more algorithms.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use xhash::engine::arg_parser::Cli;
use xhash::engine::handle_run;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
