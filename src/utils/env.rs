//! Environment overrides: process env first, then `.env` in the working directory.

use std::path::Path;

use crate::error::ConfigError;
use crate::utils::config::DIGESTERS_ENV;

fn try_env_then_dotenv(dir: &Path, key: &str) -> Option<String> {
    if let Ok(s) = std::env::var(key) {
        return Some(s.trim().to_string());
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Ok(s) = std::env::var(key) {
            return Some(s.trim().to_string());
        }
    }
    None
}

/// Parse a bounded worker count. Zero, negatives, and non-numbers are rejected.
pub fn parse_digesters(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConfigError::Digesters {
            name,
            value: value.to_string(),
        }),
    }
}

/// `DIGESTERS` from the environment or `.env` in `dir`. A set but invalid value is an error.
pub fn digesters_from_env(dir: &Path) -> Result<Option<usize>, ConfigError> {
    try_env_then_dotenv(dir, DIGESTERS_ENV)
        .map(|v| parse_digesters(DIGESTERS_ENV, &v))
        .transpose()
}
