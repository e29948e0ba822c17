use anyhow::{Context, Result};
use clap::Args;
use datatc_core::ProjectRegistry;

use crate::output::format::format_path;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct LatestArgs {
    /// Registered project name (or a directory path)
    pub project: String,

    /// Entries to descend into before picking the latest
    pub subpath: Vec<String>,
}

pub fn run(args: &LatestArgs, registry: &ProjectRegistry, format: OutputFormat) -> Result<()> {
    let root = super::open_project(registry, &args.project)?;
    let node = super::navigate(&root, &args.subpath)?;
    let latest = node
        .latest()
        .with_context(|| format!("Failed to pick the latest entry of {}", node.breadcrumb()))?;
    println!("{}", format_path(latest.path(), format));
    Ok(())
}
