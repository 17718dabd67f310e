use colored::{ColoredString, Colorize};
use env_logger::{Builder, Env};
use log::{Level, LevelFilter, Record};
use std::io::Write;

fn level_tag(level: Level) -> Option<ColoredString> {
    match level {
        Level::Error => Some("ERROR".red().bold()),
        Level::Warn => Some("WARN".yellow()),
        Level::Debug => Some("debug".dimmed()),
        Level::Trace => Some("trace".dimmed()),
        Level::Info => None,
    }
}

/// `[xhash] msg` for info; level tag and module for everything else.
fn render(record: &Record) -> String {
    let name = env!("CARGO_PKG_NAME").cyan();
    match level_tag(record.level()) {
        Some(tag) => format!(
            "[{} {} {}] {}",
            name,
            tag,
            record.target().white(),
            record.args()
        ),
        None => format!("[{}] {}", name, record.args()),
    }
}

/// Logger configuration: warnings from dependencies, info (or debug when `verbose`) from
/// xhash, then the directives in `env` applied on top so `RUST_LOG=xhash=trace` wins.
pub fn logger_builder(verbose: bool, env: Env<'_>) -> Builder {
    let ours = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_CRATE_NAME"), ours)
        .format(|buf, record| writeln!(buf, "{}", render(record)))
        .parse_env(env);
    builder
}

/// Install the stderr logger, honouring `RUST_LOG` and `RUST_LOG_STYLE`. Later calls are no-ops.
pub fn setup_logging(verbose: bool) {
    let _ = logger_builder(verbose, Env::default()).try_init();
}
