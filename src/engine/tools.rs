//! Input and output helpers: file collection, import identifiers, JSON export files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ParseError, PersistenceError};

/// Files directly inside `path` whose extension is `extension`, sorted. Sub-directories are not
/// descended into. A file path yields itself when it matches, nothing otherwise.
pub fn collect_files(path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let matches = |p: &Path| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
    };
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if meta.is_file() {
        return Ok(if matches(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("read directory {}", path.display()))?;
        if entry.file_type().is_file() && matches(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// One line of a Maven metadata export, e.g. `{"u": "org.apache.pdfbox|pdfbox-io|3.0.0|NA|jar"}`.
#[derive(Clone, Debug, Deserialize)]
pub struct MavenIdentifier {
    #[serde(rename = "u")]
    pub identifier: String,
}

impl MavenIdentifier {
    /// deps.dev package name: `group:artifact`.
    pub fn package_name(&self) -> Result<String, ParseError> {
        let mut parts = self.identifier.split('|');
        match (parts.next(), parts.next()) {
            (Some(group), Some(artifact)) if !group.is_empty() && !artifact.is_empty() => {
                Ok(format!("{group}:{artifact}"))
            }
            _ => Err(ParseError::record(
                self.identifier.as_str(),
                "identifier too short, expected 'group|artifact|...'",
            )),
        }
    }
}

/// Read a JSON array of [`MavenIdentifier`]s.
pub fn read_identifiers(path: &Path) -> Result<Vec<MavenIdentifier>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("decode identifiers from {}", path.display()))
}

/// One entry of the unique-component export.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentName {
    pub name: String,
}

/// Write `value` as pretty JSON to `path`, replacing any existing file.
pub fn write_json_file<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    let file_err = |source: std::io::Error| PersistenceError::File {
        path: path.display().to_string(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(file_err)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| file_err(e.into()))?;
    writer.flush().map_err(file_err)
}
