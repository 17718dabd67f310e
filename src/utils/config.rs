//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory settings file, e.g. `.xhash.toml`.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Workers ----

/// Default worker count for bounded mode.
pub const DEFAULT_DIGESTERS: usize = 20;

/// Most parallel-mode workers alive at once (digesting or waiting to hand over a result).
pub const MAX_PARALLEL_WORKERS: usize = 1024;

/// Environment variable overriding the bounded worker count.
pub const DIGESTERS_ENV: &str = "DIGESTERS";

// ---- Hashing ----

/// Digest strategy thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// Files below this size (bytes) are read whole and hashed in parallel per algorithm.
    pub const SMALL_FILE_THRESHOLD: u64 = 1_000_000;
    /// Broadcast chunk for larger files (bytes). 32 KiB.
    pub const CHUNK_SIZE: usize = 32 * 1024;
}
