use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use datatc_core::provenance::UnitInfo;

use crate::output::format::format_unit_info;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct InfoArgs {
    /// Path to a self-aware unit directory
    pub unit: PathBuf,
}

pub fn run(args: &InfoArgs, format: OutputFormat) -> Result<()> {
    let info = UnitInfo::read(&args.unit)
        .with_context(|| format!("Failed to read unit {}", args.unit.display()))?;
    print!("{}", format_unit_info(&info, format));
    Ok(())
}
