//! CLI command handler: resolve settings, run the pipeline, print sorted digests.

use anyhow::{Context, Result};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::engine::arg_parser::Cli;
use crate::engine::registry::{Algorithm, Registry};
use crate::pipeline::PathSource;
use crate::types::{DigestReport, ErrorPolicy, Opts};
use crate::utils::{apply_file_to_opts, digesters_from_env, load_xhash_toml, setup_logging};

/// Build [`Opts`]: defaults, then `.xhash.toml`, then `DIGESTERS`, then flags.
fn setup_opts(cli: &Cli, dir: &Path) -> Result<Opts> {
    let file = load_xhash_toml(dir);
    let verbose = cli
        .verbose
        .or_else(|| file.as_ref().and_then(|f| f.verbose()))
        .unwrap_or(false);
    setup_logging(verbose);

    let mut opts = Opts::default();
    if let Some(file) = &file {
        apply_file_to_opts(file, &mut opts).context("invalid settings file")?;
    }
    if let Some(n) = digesters_from_env(dir)? {
        opts.digesters = n;
    }
    if let Some(mode) = cli.mode {
        opts.mode = mode;
    }
    if let Some(n) = cli.digesters {
        opts.digesters = n;
    }
    opts.algorithms = select_algorithms(&cli.algorithms, cli.all, &opts.algorithms);
    if let Some(keep_going) = cli.keep_going {
        opts.error_policy = if keep_going {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::AbortOnFirst
        };
    }
    Ok(opts)
}

/// Named algorithms win over configured ones; `all` inverts the named selection.
pub fn select_algorithms(named: &[Algorithm], all: bool, configured: &[Algorithm]) -> Vec<Algorithm> {
    if all {
        Registry::standard()
            .algorithms()
            .filter(|a| !named.contains(a))
            .collect()
    } else if !named.is_empty() {
        named.to_vec()
    } else {
        configured.to_vec()
    }
}

/// `--files-from` wins; a single directory is walked; anything else is an explicit list.
pub fn path_source(paths: &[PathBuf], files_from: Option<&Path>) -> PathSource {
    if let Some(list) = files_from {
        return PathSource::ListFile(list.to_path_buf());
    }
    match paths {
        [] => PathSource::Tree(PathBuf::from(".")),
        [single] if single.is_dir() => PathSource::Tree(single.clone()),
        _ => PathSource::Paths(paths.to_vec()),
    }
}

/// Output lines `ALGO(path) = hex`, sorted by path, then algorithm order.
pub fn render_report(report: &DigestReport) -> Vec<String> {
    let mut paths: Vec<_> = report.digests.keys().collect();
    paths.sort();
    let mut lines = Vec::new();
    for path in paths {
        for (algorithm, digest) in &report.digests[path] {
            lines.push(format!(
                "{}({}) = {}",
                algorithm,
                path.display(),
                hex::encode(digest)
            ));
        }
    }
    lines
}

fn print_algorithms(out: &mut impl Write) -> Result<()> {
    for algorithm in Registry::standard().algorithms() {
        writeln!(out, "{:<12} {} bytes", algorithm.name(), algorithm.output_len())?;
    }
    Ok(())
}

/// Run the digester for the parsed command line.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.list_algorithms {
        return print_algorithms(&mut out);
    }

    let opts = setup_opts(cli, Path::new("."))?;
    let source = path_source(&cli.paths, cli.files_from.as_deref());
    let report = crate::digest_paths(source, &opts)?;
    debug!(
        "{} of {} file(s) digested",
        report.digests.len(),
        report.enumerated
    );

    for line in render_report(&report) {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    if !report.failures.is_empty() {
        anyhow::bail!("{} file(s) could not be digested", report.failures.len());
    }
    Ok(())
}
