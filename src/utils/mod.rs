pub mod config;
pub mod env;
pub mod logger;
pub mod workpipe_toml;

pub use config::*;
pub use env::{apply_env_to_opts, env_override};
pub use logger::setup_logging;
pub use workpipe_toml::{apply_file_to_opts, load_workpipe_toml, parse_workpipe_toml};
