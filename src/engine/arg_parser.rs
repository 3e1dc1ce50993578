use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::Settings;
use crate::utils::config::DEFAULT_EXPORT_COMPONENT_TYPE;

/// Concurrent SBOM and package-metadata pipelines.
#[derive(Clone, Parser)]
#[command(name = "sbomflow")]
#[command(about = "Store SBOMs, import registry metadata, classify components, compute version lag.")]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand. Unset flags leave file / env settings untouched.
#[derive(Clone, Debug, Default, Args)]
pub struct CommonArgs {
    /// Path to the store. Default: `sbomflow.db` in the working directory (or SBOMFLOW_DB).
    #[arg(long, short, global = true)]
    pub db: Option<PathBuf>,

    /// Worker threads. Default: available parallelism (classify: 7).
    #[arg(long, short = 'w', global = true)]
    pub workers: Option<usize>,

    /// Records per batch write (classify: per outcome bucket).
    #[arg(long, short = 'b', global = true)]
    pub batch_size: Option<usize>,

    /// Wait this many milliseconds before feeding each item. 0 disables throttling.
    #[arg(long, global = true)]
    pub rate_limit_ms: Option<u64>,

    /// Verbose output.
    #[arg(long, short = 'v', global = true, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl CommonArgs {
    /// Apply the flags that were given. Call last: flags win over file and env.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(ref db) = self.db {
            settings.db_path = Some(db.clone());
        }
        if self.workers.is_some() {
            settings.workers = self.workers;
        }
        if self.batch_size.is_some() {
            settings.batch_size = self.batch_size;
        }
        if self.rate_limit_ms.is_some() {
            settings.rate_limit_ms = self.rate_limit_ms;
        }
        if let Some(v) = self.verbose {
            settings.verbose = v;
        }
    }
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Parse every CycloneDX JSON file in DIR and store it.
    Store {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Fetch deps.dev versions for each Maven identifier in FILE (JSON array of {"u": "g|a|v|..."}).
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Classify the Maven components of stored SBOMs against Maven Central search.
    Classify {
        /// Report failed searches as errors instead of routing them to the unresolved bucket.
        #[arg(long)]
        report_failures: bool,
    },
    /// Compute version lag for every component of the SBOMs in DIR and store a report per SBOM.
    Versions {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Write the distinct names of stored components of one type to a JSON file in DIR.
    Export {
        /// Output directory. Default: the system temp directory.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// CycloneDX component type to export.
        #[arg(long, default_value = DEFAULT_EXPORT_COMPONENT_TYPE)]
        component_type: String,
    },
    /// Print how far USED lags behind the newest of KNOWN.
    Distance {
        #[arg(value_name = "USED")]
        used: String,
        #[arg(value_name = "KNOWN")]
        known: Vec<String>,
    },
}
