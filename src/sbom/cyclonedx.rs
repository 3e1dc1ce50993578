use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::ParseError;

use super::PackageUrl;

/// The subset of a CycloneDX JSON document the pipelines use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclonedxSbom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bom_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub components: Vec<Component>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
}

impl Component {
    /// Stable id: bom-ref, else package URL, else `group:name`.
    pub fn id(&self) -> String {
        self.bom_ref
            .clone()
            .or_else(|| self.purl.clone())
            .unwrap_or_else(|| match &self.group {
                Some(group) => format!("{group}:{}", self.name),
                None => self.name.clone(),
            })
    }

    /// Parsed package URL, if the component has a valid one.
    pub fn package_url(&self) -> Option<PackageUrl> {
        self.purl.as_deref().and_then(|p| PackageUrl::parse(p).ok())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl CyclonedxSbom {
    /// Store key: serial number, else `fallback` (usually the file path).
    pub fn key_or(&self, fallback: &str) -> String {
        self.serial_number
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Read and decode a CycloneDX JSON file. Invalid JSON or a document without `components`
/// is a [`ParseError::Record`].
pub fn read_cyclonedx(path: &Path) -> Result<CyclonedxSbom, ParseError> {
    let file = File::open(path).map_err(|e| ParseError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        ParseError::record(path.display().to_string(), format!("incomplete sbom: {e}"))
    })
}
