use sbomflow::engine::{
    CommonArgs, ComponentName, MavenIdentifier, collect_files, handle_export, resolve_settings,
    version_report, write_json_file,
};
use sbomflow::error::{ConfigError, PersistenceError, QueryError};
use sbomflow::sbom::{Component, CyclonedxSbom, PackageUrl, read_cyclonedx};
use sbomflow::source::{DepsDev, MavenCentral, PackageMetadata, VersionSource};
use sbomflow::store::{DocumentStore, SqliteStore};
use sbomflow::{BatchSize, ParseError, PipelineError, Record, Settings, VersionRecord};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

// --- collect_files ---

#[test]
fn test_collect_files_non_recursive_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.json"), "{}").unwrap();
    fs::write(dir.path().join("a.json"), "{}").unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("c.json"), "{}").unwrap();

    let files = collect_files(dir.path(), "json").unwrap();
    assert_eq!(
        files,
        vec![dir.path().join("a.json"), dir.path().join("b.json")]
    );
}

#[test]
fn test_collect_files_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("one.json");
    let txt = dir.path().join("one.txt");
    fs::write(&json, "{}").unwrap();
    fs::write(&txt, "x").unwrap();
    assert_eq!(collect_files(&json, "json").unwrap(), vec![json.clone()]);
    assert!(collect_files(&txt, "json").unwrap().is_empty());
}

#[test]
fn test_collect_files_missing_path_errors() {
    assert!(collect_files(&PathBuf::from("/definitely/not/here"), "json").is_err());
}

// --- import identifiers ---

#[test]
fn test_maven_identifier_package_name() {
    let id: MavenIdentifier =
        serde_json::from_str(r#"{"u": "org.apache.pdfbox|pdfbox-io|3.0.0-beta1|NA|jar"}"#).unwrap();
    assert_eq!(id.package_name().unwrap(), "org.apache.pdfbox:pdfbox-io");

    let short = MavenIdentifier {
        identifier: "org.apache.pdfbox".to_string(),
    };
    assert!(matches!(short.package_name(), Err(ParseError::Record { .. })));
}

// --- package URLs ---

#[test]
fn test_purl_maven() {
    let p = PackageUrl::parse("pkg:maven/com.google.guava/guava@31.0-jre?type=jar").unwrap();
    assert_eq!(p.kind, "maven");
    assert_eq!(p.namespace.as_deref(), Some("com.google.guava"));
    assert_eq!(p.name, "guava");
    assert_eq!(p.version.as_deref(), Some("31.0-jre"));
    assert_eq!(p.deps_dev_system(), Some("MAVEN"));
    assert_eq!(p.deps_dev_name(), "com.google.guava:guava");
}

#[test]
fn test_purl_scoped_npm() {
    let p = PackageUrl::parse("pkg:npm/%40types/node@20.1.0").unwrap();
    assert_eq!(p.namespace.as_deref(), Some("@types"));
    assert_eq!(p.deps_dev_system(), Some("NPM"));
    assert_eq!(p.deps_dev_name(), "@types/node");
}

#[test]
fn test_purl_percent_escapes() {
    let p = PackageUrl::parse("pkg:maven/org.acme/caf%C3%A9%20lib@1.0%2Bbuild").unwrap();
    assert_eq!(p.name, "café lib");
    assert_eq!(p.version.as_deref(), Some("1.0+build"));

    let p = PackageUrl::parse("pkg:npm/bad%zzname%4@1.0.0").unwrap();
    assert_eq!(p.name, "bad%zzname%4");
}

#[test]
fn test_purl_without_version_and_unknown_type() {
    let p = PackageUrl::parse("pkg:deb/debian/curl").unwrap();
    assert_eq!(p.version, None);
    assert_eq!(p.deps_dev_system(), None);
}

#[test]
fn test_purl_rejects_malformed() {
    assert!(PackageUrl::parse("maven/g/a@1").is_err());
    assert!(PackageUrl::parse("pkg:maven").is_err());
}

// --- CycloneDX ---

const SBOM_JSON: &str = r#"{
  "bomFormat": "CycloneDX",
  "serialNumber": "urn:uuid:1234",
  "components": [
    {"bom-ref": "ref-io", "type": "library", "name": "commons-io", "version": "2.11.0",
     "purl": "pkg:maven/commons-io/commons-io@2.11.0"},
    {"type": "library", "name": "guava", "group": "com.google.guava", "version": "31.0",
     "purl": "pkg:maven/com.google.guava/guava@31.0"},
    {"type": "library", "name": "no-purl", "version": "1.0.0"}
  ],
  "dependencies": [{"ref": "ref-io", "dependsOn": []}]
}"#;

#[test]
fn test_read_cyclonedx() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bom.json");
    fs::write(&path, SBOM_JSON).unwrap();

    let sbom = read_cyclonedx(&path).unwrap();
    assert_eq!(sbom.serial_number.as_deref(), Some("urn:uuid:1234"));
    assert_eq!(sbom.components.len(), 3);
    assert_eq!(sbom.components[0].component_type.as_deref(), Some("library"));
    assert_eq!(sbom.dependencies[0].reference, "ref-io");
    assert_eq!(sbom.key_or("fallback"), "urn:uuid:1234");
}

#[test]
fn test_read_cyclonedx_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{"bomFormat": "CycloneDX"}"#).unwrap();
    assert!(matches!(read_cyclonedx(&path), Err(ParseError::Record { .. })));
    assert!(matches!(
        read_cyclonedx(&dir.path().join("missing.json")),
        Err(ParseError::Io { .. })
    ));
}

#[test]
fn test_component_id_fallbacks() {
    let mut c = Component {
        name: "guava".to_string(),
        group: Some("com.google.guava".to_string()),
        ..Default::default()
    };
    assert_eq!(c.id(), "com.google.guava:guava");
    c.purl = Some("pkg:maven/com.google.guava/guava@31.0".to_string());
    assert_eq!(c.id(), "pkg:maven/com.google.guava/guava@31.0");
    c.bom_ref = Some("ref".to_string());
    assert_eq!(c.id(), "ref");
}

#[test]
fn test_component_serializes_cyclonedx_names() {
    let c = Component {
        bom_ref: Some("r".to_string()),
        name: "n".to_string(),
        component_type: Some("library".to_string()),
        ..Default::default()
    };
    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(v["bom-ref"], "r");
    assert_eq!(v["type"], "library");
    assert!(v.get("purl").is_none());
}

// --- version reports ---

struct StaticVersions(HashMap<String, Vec<&'static str>>);

impl VersionSource for StaticVersions {
    fn versions(&self, system: &str, name: &str) -> Result<PackageMetadata, QueryError> {
        match self.0.get(name) {
            Some(list) => Ok(PackageMetadata {
                name: name.to_string(),
                system: system.to_string(),
                versions: list.iter().map(|v| VersionRecord::new(*v)).collect(),
            }),
            None => Err(QueryError::Status {
                url: format!("https://deps.example/{name}"),
                status: 404,
            }),
        }
    }
}

#[test]
fn test_version_report_skips_what_it_cannot_measure() {
    let sbom: CyclonedxSbom = serde_json::from_str(SBOM_JSON).unwrap();
    let source = StaticVersions(HashMap::from([(
        "commons-io:commons-io".to_string(),
        vec!["2.10.0", "2.11.0", "2.12.0", "2.13.0"],
    )]));

    let report = version_report(&sbom, "bom.json", &source);
    assert_eq!(report.sbom, "urn:uuid:1234");
    assert_eq!(report.components.len(), 1);
    assert_eq!(report.components[0].component_id, "ref-io");
    assert_eq!(report.components[0].distance.missed_releases, 2);
    // guava: registry 404; no-purl: nothing to query
    assert_eq!(report.skipped, 2);
    assert_eq!(report.average_missed_releases, 2.0);
}

// --- export ---

fn store_with_sboms(path: &std::path::Path) -> SqliteStore {
    let store = SqliteStore::open(path).unwrap();
    let first: serde_json::Value = serde_json::from_str(SBOM_JSON).unwrap();
    let second = serde_json::json!({
        "serialNumber": "urn:uuid:5678",
        "components": [
            {"type": "library", "name": "zlib", "version": "1.3"},
            {"type": "library", "name": "guava", "version": "32.0"},
            {"type": "application", "name": "my-app", "version": "0.1.0"}
        ]
    });
    store
        .insert_many(
            "sboms",
            &[Record::new("urn:uuid:1234", first), Record::new("urn:uuid:5678", second)],
        )
        .unwrap();
    store
}

fn read_export(dir: &std::path::Path) -> Vec<String> {
    let raw = fs::read_to_string(dir.join("unique_component_names.json")).unwrap();
    let names: Vec<ComponentName> = serde_json::from_str(&raw).unwrap();
    names.into_iter().map(|n| n.name).collect()
}

#[test]
fn test_export_writes_sorted_unique_names_of_one_type() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_sboms(&dir.path().join("export.db"));
    let settings = Settings {
        workers: Some(3),
        ..Default::default()
    };

    let stats = handle_export(
        &settings,
        &store,
        dir.path(),
        "library",
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
    assert_eq!(stats.dispatched, 4);
    assert_eq!(stats.flushed_items, 4);
    assert_eq!(stats.batches, 1);
    assert_eq!(
        read_export(dir.path()),
        vec!["commons-io", "guava", "no-purl", "zlib"]
    );

    handle_export(
        &settings,
        &store,
        dir.path(),
        "application",
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
    assert_eq!(read_export(dir.path()), vec!["my-app"]);
}

#[test]
fn test_export_with_no_matches_writes_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_sboms(&dir.path().join("export.db"));
    let stats = handle_export(
        &Settings::default(),
        &store,
        dir.path(),
        "firmware",
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
    assert_eq!(stats.dispatched, 0);
    assert_eq!(stats.batches, 1);
    assert!(read_export(dir.path()).is_empty());
}

#[test]
fn test_export_rejects_missing_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().unwrap();
    let result = handle_export(
        &Settings::default(),
        &store,
        &dir.path().join("nope"),
        "library",
        Arc::new(AtomicBool::new(false)),
    );
    assert!(result.is_err());
}

#[test]
fn test_write_json_file_reports_unwritable_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.json");
    let err = write_json_file(&path, &["a"]).unwrap_err();
    assert!(matches!(err, PersistenceError::File { .. }));
    assert!(err.to_string().contains("out.json"));
}

// --- settings ---

#[test]
fn test_settings_dispatch_config_defaults_and_overrides() {
    let settings = Settings::default();
    let cfg = settings.dispatch_config(BatchSize::Unbounded, Some(Duration::from_millis(100)));
    assert_eq!(cfg.batch_size, BatchSize::Unbounded);
    assert_eq!(cfg.rate_limit, Some(Duration::from_millis(100)));
    assert_eq!(cfg.workers, None);

    let settings = Settings {
        workers: Some(2),
        batch_size: Some(50),
        rate_limit_ms: Some(0),
        ..Default::default()
    };
    let cfg = settings.dispatch_config(BatchSize::Unbounded, Some(Duration::from_millis(100)));
    assert_eq!(cfg.batch_size, BatchSize::Fixed(50));
    assert_eq!(cfg.rate_limit, None);
    assert_eq!(cfg.workers, Some(2));
}

#[test]
fn test_resolve_settings_flags_win_over_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(".sbomflow.toml"),
        "[settings]\nworkers = 3\nbatch_size = 40\nverbose = true\n",
    )
    .unwrap();
    let flags = CommonArgs {
        workers: Some(9),
        ..Default::default()
    };
    let settings = resolve_settings(&flags, dir.path());
    assert_eq!(settings.workers, Some(9));
    assert_eq!(settings.batch_size, Some(40));
    assert!(settings.verbose);
}

// --- sources ---

#[test]
fn test_maven_search_url() {
    let maven = MavenCentral::new().unwrap();
    let url = maven.search_url("cloudevents-api");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("q".to_string(), "a:cloudevents-api".to_string()),
            ("rows".to_string(), "20".to_string()),
            ("wt".to_string(), "json".to_string()),
        ]
    );
    assert_eq!(url.path(), "/solrsearch/select");
}

#[test]
fn test_deps_dev_package_url() {
    let deps = DepsDev::new().unwrap();
    assert_eq!(
        deps.package_url("MAVEN", "com.google.guava:guava")
            .unwrap()
            .as_str(),
        "https://api.deps.dev/v3/systems/MAVEN/packages/com.google.guava:guava"
    );
    assert_eq!(
        deps.package_url("NPM", "@types/node").unwrap().as_str(),
        "https://api.deps.dev/v3/systems/NPM/packages/@types%2Fnode"
    );
    assert!(deps.package_url("MAVEN", "").is_err());
}

// --- errors ---

#[test]
fn test_error_display() {
    let rate = QueryError::RateLimited {
        url: "https://api.deps.dev/x".to_string(),
        retry_after: Some("12".to_string()),
    };
    assert_eq!(
        rate.to_string(),
        "rate limited by https://api.deps.dev/x (retry after: 12)"
    );
    let unknown = QueryError::RateLimited {
        url: "u".to_string(),
        retry_after: None,
    };
    assert!(unknown.to_string().ends_with("(retry after: unknown)"));

    let cfg = ConfigError::new("workers", "must be at least 1");
    assert_eq!(cfg.to_string(), "config error: workers: must be at least 1");

    let wrapped: PipelineError = rate.into();
    assert_eq!(wrapped.kind(), "query");
    assert!(wrapped.to_string().starts_with("rate limited by"));

    let kinds: Vec<&str> = [
        PipelineError::from(ParseError::record("x", "bad")),
        PipelineError::from(PersistenceError::Poisoned),
    ]
    .iter()
    .map(PipelineError::kind)
    .collect();
    assert_eq!(kinds, vec!["parse", "persistence"]);
}
