//! Engine module: CLI arguments, command handlers, progress display and input helpers.

pub mod arg_parser;
pub mod handlers;
pub mod progress;
pub mod tools;

pub use arg_parser::{Cli, Commands, CommonArgs};
pub use handlers::{
    handle_classify, handle_distance, handle_export, handle_import, handle_run, handle_store,
    handle_versions, resolve_settings, version_report,
};
pub use tools::{
    ComponentName, MavenIdentifier, collect_files, read_identifiers, write_json_file,
};
