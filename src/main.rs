//! sbomflow CLI: store SBOMs, import registry metadata, classify components, compute version lag.

use anyhow::Result;
use clap::Parser;
use sbomflow::engine::arg_parser::Cli;
use sbomflow::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
