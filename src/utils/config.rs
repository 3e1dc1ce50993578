//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    settings_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!("{pkg}.db"),
                settings_filename: format!(".{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default store filename, created in the working directory.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }

    /// Environment variable naming the store path (e.g. `SBOMFLOW_DB`).
    pub fn db_env_var(&self) -> String {
        format!("{}_DB", self.env_prefix)
    }
}

// ---- Dispatcher ----

/// Batch size used when a dispatch config does not name one.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// "Unbounded" batches resolve to this; fixed sizes above it are clamped to it.
pub const UNBOUNDED_BATCH_CAP: usize = 10_000;

// ---- Classification cache ----

/// Worker pool size for the classifying cache.
pub const CLASSIFY_WORKERS: usize = 7;

/// Per-bucket flush threshold for the classifying cache.
pub const BUCKET_THRESHOLD: usize = 200;

// ---- External sources ----

pub struct HttpConsts;

impl HttpConsts {
    /// Per-request timeout for registry APIs.
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// Rows requested from Maven Central search.
    pub const MAVEN_SEARCH_ROWS: u32 = 20;
    pub const MAVEN_SEARCH_URL: &'static str = "https://search.maven.org/solrsearch/select";
    pub const DEPS_DEV_URL: &'static str = "https://api.deps.dev/v3/systems";
    /// Producer throttle for deps.dev imports (10 requests per second).
    pub const DEPS_DEV_RATE_LIMIT_MS: u64 = 100;
}

// ---- Store ----

/// Collection names used by the CLI commands.
pub struct Collections;

impl Collections {
    pub const SBOMS: &'static str = "sboms";
    pub const DEPS_METADATA: &'static str = "deps_metadata";
    pub const VERSION_REPORTS: &'static str = "version_reports";
    pub const MVN_MIRROR: &'static str = "mvn_mirror";
    pub const MVN_MULTI_RESULT: &'static str = "mvn_multi_result";
    pub const MVN_BLACKLIST: &'static str = "mvn_blacklist";
}

/// File the `export` command writes into its output directory.
pub const EXPORT_FILENAME: &str = "unique_component_names.json";

/// CycloneDX component type exported when none is given.
pub const DEFAULT_EXPORT_COMPONENT_TYPE: &str = "library";

/// Extension of SBOM input files picked up by the file collector.
pub const SBOM_EXTENSION: &str = "json";
