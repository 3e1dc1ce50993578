//! Command handlers: one per subcommand.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::classify::{ClassifyConfig, ClassifyStats, ClassifyingCache, QueryFailurePolicy};
use crate::engine::arg_parser::{Cli, Commands, CommonArgs};
use crate::engine::progress::{create_progress_bar, finish_progress_bar, update_progress_bar};
use crate::engine::tools::{
    ComponentName, MavenIdentifier, collect_files, read_identifiers, write_json_file,
};
use crate::error::{PersistenceError, PipelineError};
use crate::pipeline::{BatchSize, DispatchStats, Dispatcher};
use crate::sbom::{CyclonedxSbom, read_cyclonedx};
use crate::source::{DepsDev, MavenCentral, MetadataSource, VersionSource};
use crate::store::{DocumentStore, SqliteStore};
use crate::utils::config::{
    BUCKET_THRESHOLD, CLASSIFY_WORKERS, Collections, EXPORT_FILENAME, HttpConsts, PackagePaths,
    SBOM_EXTENSION,
};
use crate::utils::sbomflow_toml::{apply_file_to_settings, load_sbomflow_toml};
use crate::utils::{db_path_from_env, setup_logging};
use crate::version::version_distance;
use crate::{ComponentDistance, Record, Settings, VersionReport};

/// Merge settings (defaults → `.sbomflow.toml` → env → flags) found relative to `dir`.
pub fn resolve_settings(common: &CommonArgs, dir: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Some(file) = load_sbomflow_toml(dir) {
        apply_file_to_settings(&file, &mut settings);
    }
    if let Some(db) = db_path_from_env(dir) {
        settings.db_path = Some(db);
    }
    common.apply_to(&mut settings);
    settings
}

fn db_path(settings: &Settings, dir: &Path) -> PathBuf {
    settings
        .db_path
        .clone()
        .unwrap_or_else(|| dir.join(PackagePaths::get().db_filename()))
}

/// Stop flag raised by Ctrl+C. Feeding stops; in-flight items still finish and flush.
fn install_stop_flag() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::Relaxed);
    }) {
        warn!("Ctrl+C handler not installed: {}", e);
    }
    stop
}

/// Resolve settings, set up logging and run the chosen subcommand.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let settings = resolve_settings(&cli.common, &cwd);
    setup_logging(settings.verbose);
    debug!("{} settings: {:?}", PackagePaths::get().pkg_name(), settings);

    let open_store = || SqliteStore::open(&db_path(&settings, &cwd));
    match &cli.command {
        Commands::Store { dir } => {
            handle_store(&settings, &open_store()?, dir, install_stop_flag())?;
        }
        Commands::Import { file } => {
            let source = DepsDev::new()?;
            handle_import(&settings, &open_store()?, &source, file, install_stop_flag())?;
        }
        Commands::Classify { report_failures } => {
            let source = MavenCentral::new()?;
            let policy = if *report_failures {
                QueryFailurePolicy::Report
            } else {
                QueryFailurePolicy::Unresolved
            };
            handle_classify(&settings, &open_store()?, &source, policy, install_stop_flag())?;
        }
        Commands::Versions { dir } => {
            let source = DepsDev::new()?;
            handle_versions(&settings, &open_store()?, &source, dir, install_stop_flag())?;
        }
        Commands::Export {
            out,
            component_type,
        } => {
            let out = out.clone().unwrap_or_else(std::env::temp_dir);
            handle_export(
                &settings,
                &open_store()?,
                &out,
                component_type,
                install_stop_flag(),
            )?;
        }
        Commands::Distance { used, known } => handle_distance(used, known)?,
    }
    Ok(())
}

/// Parse the CycloneDX files in `dir` and store each one in the `sboms` collection.
pub fn handle_store(
    settings: &Settings,
    store: &SqliteStore,
    dir: &Path,
    stop: Arc<AtomicBool>,
) -> Result<DispatchStats> {
    let files = collect_files(dir, SBOM_EXTENSION)?;
    info!("Storing {} SBOM files from {}", files.len(), dir.display());
    if store.ensure_index(Collections::SBOMS, "serialNumber")? {
        info!("Created index on {}.serialNumber", Collections::SBOMS);
    }

    let bar = create_progress_bar(files.len(), "Storing SBOMs");
    let config = settings.dispatch_config(BatchSize::default(), None);
    let mut dispatcher = Dispatcher::new(&config)?.with_stop_flag(stop);
    let stats = dispatcher.dispatch(
        files,
        |path: PathBuf| -> Result<Record, PipelineError> {
            let sbom = read_cyclonedx(&path)?;
            let key = sbom.key_or(&path.display().to_string());
            Ok(Record::from_value(key, &sbom)
                .map_err(|e| PersistenceError::json(Collections::SBOMS, e))?)
        },
        |batch| {
            store.insert_many(Collections::SBOMS, &batch.items)?;
            update_progress_bar(&bar, batch.len());
            Ok(())
        },
    );
    finish_progress_bar(&bar);
    info!(
        "Stored {} of {} SBOMs ({} failed)",
        stats.flushed_items, stats.dispatched, stats.failed
    );
    Ok(stats)
}

/// Fetch deps.dev versions for every identifier in `file` into `deps_metadata`.
pub fn handle_import<V: VersionSource>(
    settings: &Settings,
    store: &impl DocumentStore,
    source: &V,
    file: &Path,
    stop: Arc<AtomicBool>,
) -> Result<DispatchStats> {
    let identifiers = read_identifiers(file)?;
    info!("Importing versions for {} identifiers", identifiers.len());

    let bar = create_progress_bar(identifiers.len(), "Importing");
    let config = settings.dispatch_config(
        BatchSize::Unbounded,
        Some(Duration::from_millis(HttpConsts::DEPS_DEV_RATE_LIMIT_MS)),
    );
    let mut dispatcher = Dispatcher::new(&config)?.with_stop_flag(stop);
    let stats = dispatcher.dispatch(
        identifiers,
        |id: MavenIdentifier| -> Result<Record, PipelineError> {
            let name = id.package_name()?;
            debug!("Querying deps.dev for {}", name);
            let metadata = source.versions("MAVEN", &name)?;
            Ok(Record::from_value(name, &metadata)
                .map_err(|e| PersistenceError::json(Collections::DEPS_METADATA, e))?)
        },
        |batch| {
            store.insert_many(Collections::DEPS_METADATA, &batch.items)?;
            update_progress_bar(&bar, batch.len());
            Ok(())
        },
    );
    finish_progress_bar(&bar);
    info!(
        "Imported {} of {} packages ({} failed)",
        stats.flushed_items, stats.dispatched, stats.failed
    );
    Ok(stats)
}

/// Stream the unique Maven components of stored SBOMs through the classifying cache.
pub fn handle_classify<M: MetadataSource>(
    settings: &Settings,
    store: &SqliteStore,
    source: &M,
    query_failure: QueryFailurePolicy,
    stop: Arc<AtomicBool>,
) -> Result<ClassifyStats> {
    let config = ClassifyConfig {
        workers: settings.workers.unwrap_or(CLASSIFY_WORKERS),
        bucket_threshold: settings.batch_size.unwrap_or(BUCKET_THRESHOLD),
        query_failure,
        rate_limit: settings
            .rate_limit_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis),
        ..Default::default()
    };
    let cache = ClassifyingCache::new(store, source, config)?.with_stop_flag(stop);
    let created = cache.ensure_indexes()?;
    debug!("Created {} sink indexes", created);

    store.scan_maven_components(Collections::SBOMS, |components| cache.fill(components))
}

/// Stream the distinct names of stored components of `component_type` through the dispatcher
/// and write them, sorted, to one JSON file in `out`.
pub fn handle_export(
    settings: &Settings,
    store: &SqliteStore,
    out: &Path,
    component_type: &str,
    stop: Arc<AtomicBool>,
) -> Result<DispatchStats> {
    if !out.is_dir() {
        bail!("output path {} is not a directory", out.display());
    }
    let out_path = out.join(EXPORT_FILENAME);
    info!(
        "Exporting unique '{}' component names to {}",
        component_type,
        out_path.display()
    );

    let config = settings.dispatch_config(BatchSize::Unbounded, None);
    let mut dispatcher = Dispatcher::new(&config)?.with_stop_flag(stop);
    let mut names: Vec<ComponentName> = Vec::new();
    let stats = store.scan_component_names(Collections::SBOMS, component_type, |rows| {
        dispatcher.dispatch(
            rows,
            |name: String| -> Result<ComponentName, PipelineError> { Ok(ComponentName { name }) },
            |batch| {
                names.extend(batch.items);
                if batch.terminal {
                    names.sort();
                    write_json_file(&out_path, &names)?;
                }
                Ok(())
            },
        )
    })?;
    if stats.write_failures > 0 {
        bail!("export to {} failed", out_path.display());
    }
    info!(
        "Exported {} component names to {}",
        stats.flushed_items,
        out_path.display()
    );
    Ok(stats)
}

/// Version lag of every component with a package URL, one report per SBOM file.
pub fn handle_versions<V: VersionSource>(
    settings: &Settings,
    store: &impl DocumentStore,
    source: &V,
    dir: &Path,
    stop: Arc<AtomicBool>,
) -> Result<DispatchStats> {
    let files = collect_files(dir, SBOM_EXTENSION)?;
    info!("Computing version lag for {} SBOM files", files.len());
    if store.ensure_index(Collections::VERSION_REPORTS, "sbom")? {
        info!("Created index on {}.sbom", Collections::VERSION_REPORTS);
    }

    let bar = create_progress_bar(files.len(), "Version lag");
    let config = settings.dispatch_config(BatchSize::default(), None);
    let mut dispatcher = Dispatcher::new(&config)?.with_stop_flag(stop);
    let stats = dispatcher.dispatch(
        files,
        |path: PathBuf| -> Result<Record, PipelineError> {
            let sbom = read_cyclonedx(&path)?;
            let report = version_report(&sbom, &path.display().to_string(), source);
            info!(
                "{}: average missed releases {:.2} over {} components",
                report.sbom,
                report.average_missed_releases,
                report.components.len()
            );
            Ok(Record::from_value(report.sbom.clone(), &report)
                .map_err(|e| PersistenceError::json(Collections::VERSION_REPORTS, e))?)
        },
        |batch| {
            store.insert_many(Collections::VERSION_REPORTS, &batch.items)?;
            update_progress_bar(&bar, batch.len());
            Ok(())
        },
    );
    finish_progress_bar(&bar);
    Ok(stats)
}

/// Distances for every component of `sbom` that has a version and a deps.dev-known package
/// URL. Components that fail anywhere along the way are skipped and counted.
pub fn version_report<V: VersionSource + ?Sized>(
    sbom: &CyclonedxSbom,
    fallback_key: &str,
    source: &V,
) -> VersionReport {
    let mut components = Vec::with_capacity(sbom.components.len());
    let mut skipped = 0_usize;
    for component in &sbom.components {
        let target = component.version.as_deref().zip(
            component
                .package_url()
                .and_then(|p| p.deps_dev_system().map(|s| (s, p.deps_dev_name()))),
        );
        let Some((used, (system, name))) = target else {
            skipped += 1;
            continue;
        };
        let distance = source
            .versions(system, &name)
            .map_err(PipelineError::from)
            .and_then(|meta| version_distance(used, &meta.versions).map_err(PipelineError::from));
        match distance {
            Ok(distance) => components.push(ComponentDistance {
                component_id: component.id(),
                name,
                used_version: used.to_string(),
                distance,
            }),
            Err(e) => {
                debug!("Skipping {} {}: {}", name, used, e);
                skipped += 1;
            }
        }
    }
    VersionReport::new(sbom.key_or(fallback_key), components, skipped)
}

/// Print the distance of `used` from `known` as JSON.
pub fn handle_distance(used: &str, known: &[String]) -> Result<()> {
    let distance = version_distance(used, known).context("compute version distance")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&distance).context("encode distance")?
    );
    Ok(())
}
