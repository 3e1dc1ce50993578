pub mod config;
pub mod env;
pub mod logger;
pub(crate) mod sbomflow_toml;

pub use config::*;
pub use env::db_path_from_env;
pub use logger::setup_logging;
