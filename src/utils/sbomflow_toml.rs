//! Load `.sbomflow.toml` from a directory (CLI only). Library callers pass configs directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Settings;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SbomflowToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    db_path: Option<String>,
    workers: Option<usize>,
    batch_size: Option<usize>,
    rate_limit_ms: Option<u64>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir` if present. None if missing or unreadable.
pub(crate) fn load_sbomflow_toml(dir: &Path) -> Option<SbomflowToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_sbomflow_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_sbomflow_toml(s: &str) -> Result<SbomflowToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite a settings field from the file when present.
macro_rules! apply_file_opt {
    ($section:expr, $settings:expr, $field:ident) => {
        if let Some(v) = $section.$field {
            $settings.$field = Some(v);
        }
    };
}

/// Apply file config to settings (only fields present in the file). Call before env and CLI.
pub(crate) fn apply_file_to_settings(file: &SbomflowToml, settings: &mut Settings) {
    let section = &file.settings;
    if let Some(ref p) = section.db_path {
        settings.db_path = Some(PathBuf::from(p));
    }
    apply_file_opt!(section, settings, workers);
    apply_file_opt!(section, settings, batch_size);
    apply_file_opt!(section, settings, rate_limit_ms);
    if let Some(v) = section.verbose {
        settings.verbose = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file = parse_sbomflow_toml(
            r#"
            [settings]
            db_path = "/tmp/meta.db"
            workers = 3
            rate_limit_ms = 250
            "#,
        )
        .unwrap();
        let mut settings = Settings {
            batch_size: Some(50),
            ..Default::default()
        };
        apply_file_to_settings(&file, &mut settings);
        assert_eq!(settings.db_path, Some(PathBuf::from("/tmp/meta.db")));
        assert_eq!(settings.workers, Some(3));
        assert_eq!(settings.rate_limit_ms, Some(250));
        assert_eq!(settings.batch_size, Some(50));
        assert!(!settings.verbose);
    }

    #[test]
    fn empty_file_is_valid() {
        let file = parse_sbomflow_toml("").unwrap();
        let mut settings = Settings::default();
        apply_file_to_settings(&file, &mut settings);
        assert!(settings.db_path.is_none());
    }
}
