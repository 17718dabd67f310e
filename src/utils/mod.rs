pub mod config;
pub mod env;
pub mod fd_limit;
pub mod logger;
pub mod xhash_toml;

pub use config::*;
pub use env::{digesters_from_env, parse_digesters};
pub use fd_limit::FdBudget;
pub use logger::{logger_builder, setup_logging};
pub use xhash_toml::{XhashToml, apply_file_to_opts, load_xhash_toml};
