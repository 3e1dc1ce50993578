//! Store path from the environment: env var → `.env` in the working directory.

use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `SBOMFLOW_DB` if set, else loaded from `dir/.env` if that file sets it.
pub fn db_path_from_env(dir: &Path) -> Option<PathBuf> {
    let key = PackagePaths::get().db_env_var();
    if let Some(s) = non_empty_var(&key) {
        return Some(PathBuf::from(s));
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        return non_empty_var(&key).map(PathBuf::from);
    }
    None
}
