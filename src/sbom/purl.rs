use percent_encoding::percent_decode_str;

use crate::error::ParseError;

/// A package URL (`pkg:type/namespace/name@version?qualifiers#subpath`). Qualifiers and
/// subpath are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageUrl {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
}

impl PackageUrl {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let invalid = |reason: &str| ParseError::record(raw, reason);
        let rest = raw
            .strip_prefix("pkg:")
            .ok_or_else(|| invalid("missing 'pkg:' scheme"))?;
        let rest = rest.split('#').next().unwrap_or_default();
        let rest = rest.split('?').next().unwrap_or_default();

        let (path, version) = match rest.rsplit_once('@') {
            Some((path, version)) if !version.is_empty() => {
                (path, Some(percent_decode(version)))
            }
            Some((path, _)) => (path, None),
            None => (rest, None),
        };

        let mut segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.len() < 2 {
            return Err(invalid("expected type and name"));
        }
        let kind = segments.remove(0).to_ascii_lowercase();
        let name = percent_decode(segments.pop().unwrap_or_default());
        let namespace = (!segments.is_empty()).then(|| {
            segments
                .iter()
                .map(|s| percent_decode(s))
                .collect::<Vec<_>>()
                .join("/")
        });

        Ok(Self {
            kind,
            namespace,
            name,
            version,
        })
    }

    /// deps.dev system for this package type, if deps.dev knows it.
    pub fn deps_dev_system(&self) -> Option<&'static str> {
        match self.kind.as_str() {
            "maven" => Some("MAVEN"),
            "npm" => Some("NPM"),
            "pypi" => Some("PYPI"),
            "golang" => Some("GO"),
            "cargo" => Some("CARGO"),
            "nuget" => Some("NUGET"),
            _ => None,
        }
    }

    /// Package name as deps.dev spells it (`group:artifact` for Maven, `@scope/name` for npm).
    pub fn deps_dev_name(&self) -> String {
        match (self.kind.as_str(), &self.namespace) {
            ("maven", Some(ns)) => format!("{ns}:{}", self.name),
            ("npm", Some(ns)) => format!("{ns}/{}", self.name),
            ("golang", Some(ns)) => format!("{ns}/{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim.
fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}
