//! Load `.xhash.toml` from a directory (CLI only). The library takes [`Opts`] directly.

use serde::Deserialize;
use std::path::Path;

use crate::Opts;
use crate::engine::registry::Algorithm;
use crate::error::ConfigError;
use crate::types::{ErrorPolicy, ExecutionMode};
use crate::utils::config::PackagePaths;
use crate::utils::env::parse_digesters;

#[derive(Debug, Default, Deserialize)]
pub struct XhashToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    mode: Option<String>,
    digesters: Option<i64>,
    algorithms: Option<Vec<String>>,
    keep_going: Option<bool>,
    verbose: Option<bool>,
    small_file_threshold: Option<u64>,
    chunk_size: Option<usize>,
}

impl XhashToml {
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn verbose(&self) -> Option<bool> {
        self.settings.verbose
    }
}

/// Load `.xhash.toml` from `dir` if present. Returns None if missing, unreadable, or malformed
/// (malformed files are logged).
pub fn load_xhash_toml(dir: &Path) -> Option<XhashToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    XhashToml::parse(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $section.$field {
            $opts.$field = v;
        }
    };
}

/// Apply file settings to `opts` (only fields present in the file). Call before env and CLI.
pub fn apply_file_to_opts(file: &XhashToml, opts: &mut Opts) -> Result<(), ConfigError> {
    let section = &file.settings;
    if let Some(ref mode) = section.mode {
        opts.mode = mode.parse::<ExecutionMode>()?;
    }
    if let Some(n) = section.digesters {
        opts.digesters = parse_digesters("digesters", &n.to_string())?;
    }
    if let Some(ref names) = section.algorithms {
        opts.algorithms = names
            .iter()
            .map(|n| n.parse::<Algorithm>())
            .collect::<Result<Vec<_>, _>>()?;
    }
    if let Some(keep_going) = section.keep_going {
        opts.error_policy = if keep_going {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::AbortOnFirst
        };
    }
    apply_file_opt!(section, opts, small_file_threshold);
    apply_file_opt!(section, opts, chunk_size);
    Ok(())
}
