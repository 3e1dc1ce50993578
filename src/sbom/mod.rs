//! Minimal SBOM model: CycloneDX JSON documents and package URLs.

mod cyclonedx;
mod purl;

pub use cyclonedx::{Component, CyclonedxSbom, Dependency, read_cyclonedx};
pub use purl::PackageUrl;
